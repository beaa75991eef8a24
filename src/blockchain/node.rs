use log::{debug, info};
use thiserror::Error;
use uuid::Uuid;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::block::Block;
use super::chain::Ledger;
use super::consensus::{ChainFetcher, ConsensusResolver, HttpChainFetcher, PeerError, PeerRegistry};
use super::crypto::Address;
use super::pow::ProofOfWork;
use super::transaction::{Transaction, TransactionError};
use super::validation::ChainValidator;
use crate::config::NodeConfig;

/// Errors surfaced by node operations
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("Proof search failed: {0}")]
    Mining(String),
}

/// Tip a proof search starts from
#[derive(Debug, Clone)]
struct MiningTemplate {
    last_proof: u64,
    last_hash: String,
    generation: u64,
}

/// A ledger node: one ledger, one transaction pool and one peer registry
///
/// Cloning a node yields another handle to the same state. All ledger
/// mutation goes through a single mutex; proof searches run without it.
#[derive(Clone)]
pub struct Node {
    ledger: Arc<Mutex<Ledger>>,
    peers: Arc<RwLock<PeerRegistry>>,
    pow: ProofOfWork,
    validator: ChainValidator,
    resolver: ConsensusResolver,
    identifier: Address,
    mining_reward: f64,
    require_signatures: bool,
    /// Bumped every time the chain is replaced by consensus
    generation: Arc<AtomicU64>,
}

impl Node {
    /// Creates a node that fetches peer chains over HTTP
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let fetcher = HttpChainFetcher::new(config.peer_timeout())?;
        let node = Node::new(config, Arc::new(fetcher));

        if !config.peers.is_empty() {
            node.register_peers(&config.peers)?;
        }

        Ok(node)
    }

    /// Creates a node using the given source of peer chains
    pub fn new(config: &NodeConfig, fetcher: Arc<dyn ChainFetcher>) -> Self {
        let pow = ProofOfWork::new(config.difficulty);
        let validator = ChainValidator::new(pow);

        Node {
            ledger: Arc::new(Mutex::new(Ledger::new())),
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            pow,
            validator,
            resolver: ConsensusResolver::new(fetcher, validator),
            identifier: Address(Uuid::new_v4().simple().to_string()),
            mining_reward: config.mining_reward,
            require_signatures: config.require_signatures,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock_ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The address mining rewards are credited to
    pub fn identifier(&self) -> &Address {
        &self.identifier
    }

    pub fn difficulty(&self) -> usize {
        self.pow.difficulty()
    }

    /// Validates, optionally verifies, and pools a transaction
    ///
    /// A present signature must verify over the transaction's signing payload.
    /// Mining rewards have no signer and are never checked.
    ///
    /// # Returns
    ///
    /// The index of the block the transaction will be included in
    pub fn submit_transaction(&self, transaction: Transaction) -> Result<u64, NodeError> {
        transaction.validate()?;

        if !transaction.is_reward() {
            match transaction.signature {
                Some(_) => transaction.verify_signature()?,
                None if self.require_signatures => return Err(TransactionError::NotSigned.into()),
                None => {}
            }
        }

        let index = self.lock_ledger().new_transaction(transaction)?;
        debug!("Transaction pooled for block {}", index);

        Ok(index)
    }

    /// Searches for the next proof and forges a block crediting this node
    ///
    /// The search runs on the blocking pool without holding the ledger lock.
    /// If the tip moves while searching, the proof is stale and the search
    /// starts over from the new tip; a chain replacement aborts it early.
    pub async fn mine(&self) -> Result<Block, NodeError> {
        loop {
            let template = self.mining_template();

            let proof = match self.search(&template).await? {
                Some(proof) => proof,
                None => {
                    info!("Chain replaced during proof search, restarting");
                    continue;
                }
            };

            match self.forge(&template, proof)? {
                Some(block) => {
                    info!("New block forged: index {} proof {}", block.index, block.proof);
                    return Ok(block);
                }
                None => debug!("Tip moved during proof search, restarting"),
            }
        }
    }

    fn mining_template(&self) -> MiningTemplate {
        let ledger = self.lock_ledger();

        MiningTemplate {
            last_proof: ledger.tip().proof,
            last_hash: ledger.tip().hash(),
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    /// Runs the proof search, returning `None` if the chain was replaced meanwhile
    async fn search(&self, template: &MiningTemplate) -> Result<Option<u64>, NodeError> {
        let pow = self.pow;
        let last_proof = template.last_proof;
        let generation = template.generation;
        let current = Arc::clone(&self.generation);

        tokio::task::spawn_blocking(move || {
            pow.search_until(last_proof, || current.load(Ordering::SeqCst) != generation)
        })
        .await
        .map_err(|e| NodeError::Mining(e.to_string()))
    }

    /// Credits the reward and forges a block from whatever is pooled right now
    ///
    /// Returns `None` if the tip is no longer the one the proof was searched from.
    fn forge(&self, template: &MiningTemplate, proof: u64) -> Result<Option<Block>, NodeError> {
        let mut ledger = self.lock_ledger();

        if ledger.tip().hash() != template.last_hash {
            return Ok(None);
        }

        ledger.new_transaction(Transaction::reward(self.identifier.clone(), self.mining_reward))?;
        Ok(Some(ledger.new_block(proof, Some(template.last_hash.clone()))))
    }

    /// Snapshot of the committed chain
    pub fn chain(&self) -> Vec<Block> {
        self.lock_ledger().chain().to_vec()
    }

    /// Snapshot of the committed chain with its validity, taken under one lock
    pub fn chain_with_validity(&self) -> (Vec<Block>, bool) {
        let ledger = self.lock_ledger();
        (ledger.chain().to_vec(), self.validator.is_valid(ledger.chain()))
    }

    /// Snapshot of the transaction pool
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.lock_ledger().pending_transactions().to_vec()
    }

    /// Checks the local chain
    pub fn is_valid(&self) -> bool {
        self.validator.is_valid(self.lock_ledger().chain())
    }

    /// Registers peers; nothing is registered if any address is invalid
    ///
    /// # Returns
    ///
    /// The total number of known peers
    pub fn register_peers(&self, addresses: &[String]) -> Result<usize, NodeError> {
        let mut registry = self.peers.write().unwrap_or_else(PoisonError::into_inner);
        let mut staged = registry.clone();

        for address in addresses {
            if staged.register(address)? {
                info!("Registered peer {}", address);
            }
        }

        *registry = staged;
        Ok(registry.len())
    }

    pub fn peers(&self) -> Vec<String> {
        self.peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .peers()
            .to_vec()
    }

    /// Adopts the longest valid chain among the registered peers
    ///
    /// # Returns
    ///
    /// `true` if the local chain was replaced
    pub async fn resolve_conflicts(&self) -> bool {
        let peers = self.peers();
        let replaced = self.resolver.resolve_conflicts(&self.ledger, &peers).await;

        if replaced {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        replaced
    }
}
