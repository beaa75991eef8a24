use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::block::Block;
use super::chain::Ledger;
use super::validation::ChainValidator;

/// Path a peer serves its chain on
pub const CHAIN_PATH: &str = "/api/v1/chain";

/// Errors that can occur while managing peers
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Invalid peer address: {0}")]
    InvalidAddress(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Ordered set of peer network locations (`host:port`)
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: Vec<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer given as `http://host:port/...` or bare `host:port`
    ///
    /// # Returns
    ///
    /// `true` if the peer was not known yet
    pub fn register(&mut self, address: &str) -> Result<bool, PeerError> {
        let netloc = parse_netloc(address)?;

        if self.peers.contains(&netloc) {
            return Ok(false);
        }

        self.peers.push(netloc);
        Ok(true)
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

fn parse_netloc(address: &str) -> Result<String, PeerError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(PeerError::InvalidAddress(address.to_string()));
    }

    let url = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{}", trimmed))
    }
    .map_err(|e| PeerError::InvalidAddress(format!("{}: {}", address, e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| PeerError::InvalidAddress(address.to_string()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Body of a peer's chain endpoint
#[derive(Debug, Deserialize)]
pub struct PeerChain {
    pub length: usize,
    pub chain: Vec<Block>,
}

/// Outcome of asking one peer for its chain
#[derive(Debug, Clone, PartialEq)]
pub enum PeerResponse {
    Chain { length: usize, chain: Vec<Block> },
    Unreachable(String),
    Malformed(String),
}

impl From<PeerChain> for PeerResponse {
    fn from(body: PeerChain) -> Self {
        if body.chain.is_empty() {
            return PeerResponse::Malformed("empty chain".to_string());
        }

        if body.length != body.chain.len() {
            return PeerResponse::Malformed(format!(
                "reported length {} but sent {} blocks",
                body.length,
                body.chain.len()
            ));
        }

        PeerResponse::Chain {
            length: body.length,
            chain: body.chain,
        }
    }
}

impl PeerResponse {
    /// Decodes the body of a peer's chain endpoint
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<PeerChain>(body) {
            Ok(chain) => chain.into(),
            Err(err) => PeerResponse::Malformed(err.to_string()),
        }
    }
}

/// Source of peer chains
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> PeerResponse;
}

/// Fetches chains over HTTP with a bounded timeout per peer
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpChainFetcher { client })
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> PeerResponse {
        let url = format!("http://{}{}", peer, CHAIN_PATH);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => return PeerResponse::Unreachable(err.to_string()),
        };

        if !response.status().is_success() {
            return PeerResponse::Unreachable(format!("status {}", response.status()));
        }

        match response.bytes().await {
            Ok(body) => PeerResponse::from_body(&body),
            Err(err) => PeerResponse::Unreachable(err.to_string()),
        }
    }
}

/// Picks the longest valid chain that is strictly longer than `local_length`
///
/// Candidates are considered in scan order; a later candidate only wins if it
/// is strictly longer than the best so far, so ties go to the earliest peer.
pub fn select_longest(
    local_length: usize,
    responses: Vec<(String, PeerResponse)>,
    validator: &ChainValidator,
) -> Option<(String, Vec<Block>)> {
    let mut max_length = local_length;
    let mut longest = None;

    for (peer, response) in responses {
        match response {
            PeerResponse::Chain { length, chain } => {
                if length <= max_length {
                    debug!("Peer {} has length {}, not longer than {}", peer, length, max_length);
                    continue;
                }

                match validator.validate(&chain) {
                    Ok(()) => {
                        max_length = length;
                        longest = Some((peer, chain));
                    }
                    Err(err) => warn!("Discarding chain from {}: {}", peer, err),
                }
            }
            PeerResponse::Unreachable(reason) => warn!("Skipping unreachable peer {}: {}", peer, reason),
            PeerResponse::Malformed(reason) => warn!("Skipping peer {} with malformed response: {}", peer, reason),
        }
    }

    longest
}

/// Longest valid chain consensus across registered peers
#[derive(Clone)]
pub struct ConsensusResolver {
    fetcher: Arc<dyn ChainFetcher>,
    validator: ChainValidator,
}

impl ConsensusResolver {
    pub fn new(fetcher: Arc<dyn ChainFetcher>, validator: ChainValidator) -> Self {
        ConsensusResolver { fetcher, validator }
    }

    /// Asks every peer for its chain concurrently, keeping peer order
    pub async fn collect(&self, peers: &[String]) -> Vec<(String, PeerResponse)> {
        let fetches = peers.iter().map(|peer| async move {
            let response = self.fetcher.fetch_chain(peer).await;
            (peer.clone(), response)
        });

        join_all(fetches).await
    }

    /// Replaces the ledger's chain with the best candidate, if any
    pub fn apply(&self, ledger: &mut Ledger, responses: Vec<(String, PeerResponse)>) -> bool {
        match select_longest(ledger.len(), responses, &self.validator) {
            Some((peer, chain)) => {
                info!("Replacing chain of length {} with length {} from {}", ledger.len(), chain.len(), peer);
                ledger.replace_chain(chain);
                true
            }
            None => false,
        }
    }

    /// Runs one resolution pass over `peers`
    ///
    /// The ledger is only locked once all peers answered or timed out, and the
    /// comparison uses the local length at that moment.
    ///
    /// # Returns
    ///
    /// `true` if the local chain was replaced
    pub async fn resolve_conflicts(&self, ledger: &Mutex<Ledger>, peers: &[String]) -> bool {
        let responses = self.collect(peers).await;

        let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply(&mut ledger, responses)
    }
}
