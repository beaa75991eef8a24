use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::consensus::PeerError;
use crate::blockchain::{Address, Block, DigitalSignature, Node, NodeError, Transaction, TransactionError, Wallet};

/// Data structure for the node state
pub type NodeData = web::Data<Node>;

/// Maps a node error onto an HTTP response
fn error_response(err: &NodeError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });

    match err {
        NodeError::Transaction(TransactionError::InvalidSignature | TransactionError::NotSigned) => {
            HttpResponse::Forbidden().json(body)
        }
        NodeError::Transaction(_) | NodeError::Peer(PeerError::InvalidAddress(_)) => {
            HttpResponse::BadRequest().json(body)
        }
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,

    /// Hex signature over the transaction's signing payload
    pub signature: Option<String>,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: u64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// Index of the forged block
    pub index: u64,

    /// Transactions included in the forged block
    pub transactions: Vec<Transaction>,

    /// Proof of work of the forged block
    pub proof: u64,

    /// Hash of the block before it
    pub previous_hash: String,
}

/// Request for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer addresses, e.g. "http://127.0.0.1:5001"
    pub nodes: Option<Vec<String>>,
}

/// Response for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NodesResponse {
    /// The message
    pub message: String,

    /// Every registered peer
    pub total_nodes: Vec<String>,

    /// Number of registered peers
    pub count: usize,
}

/// Response for the resolve endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    /// The message
    pub message: String,

    /// Whether the local chain was replaced
    pub replaced: bool,

    /// The chain after resolution
    pub chain: Vec<Block>,
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's address (hex public key)
    pub address: String,

    /// The wallet's private key (hex encoded)
    pub private_key: String,
}

/// Request for the sign endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SignRequest {
    /// The sender's address, must match the private key
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,

    /// The sender's private key (hex encoded)
    pub private_key: String,
}

/// Get the full chain
///
/// Returns the entire chain, its length and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Chain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(node: NodeData) -> impl Responder {
    let (chain, is_valid) = node.chain_with_validity();

    let response = ChainResponse {
        length: chain.len(),
        chain,
        is_valid,
    };

    HttpResponse::Ok().json(response)
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.pending_transactions())
}

/// Create a new transaction
///
/// Adds a transaction to the pool. A signature, when present, must verify
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction pooled", body = TransactionResponse),
        (status = 400, description = "Missing or invalid transaction fields"),
        (status = 403, description = "Signature verification failed")
    )
)]
pub async fn new_transaction(
    node: NodeData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let request = transaction_req.into_inner();

    let transaction = Transaction {
        sender: Address(request.sender),
        recipient: Address(request.recipient),
        amount: request.amount,
        signature: request.signature.map(DigitalSignature),
    };

    match node.submit_transaction(transaction) {
        Ok(block_index) => {
            let response = TransactionResponse {
                message: format!("Transaction will be added to Block {}", block_index),
                block_index,
            };

            HttpResponse::Created().json(response)
        }
        Err(err) => {
            warn!("Rejected transaction: {}", err);
            error_response(&err)
        }
    }
}

/// Mine a new block
///
/// Runs the proof of work, credits this node with the mining reward and
/// forges a block from every pooled transaction
#[utoipa::path(
    get,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block forged successfully", body = MineResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(node: NodeData) -> impl Responder {
    match node.mine().await {
        Ok(block) => {
            let response = MineResponse {
                message: "New Block Forged".to_string(),
                index: block.index,
                transactions: block.transactions,
                proof: block.proof,
                previous_hash: block.previous_hash,
            };

            HttpResponse::Ok().json(response)
        }
        Err(err) => error_response(&err),
    }
}

/// Check if the chain is valid
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Chain validation status", body = bool)
    )
)]
pub async fn validate_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.is_valid())
}

/// Register peer nodes
#[utoipa::path(
    post,
    path = "/api/v1/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 201, description = "Peers registered", body = NodesResponse),
        (status = 400, description = "Missing or invalid peer list")
    )
)]
pub async fn register_nodes(
    node: NodeData,
    register_req: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    let nodes = match register_req.into_inner().nodes {
        Some(nodes) if !nodes.is_empty() => nodes,
        _ => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Please supply a valid list of nodes"
            }));
        }
    };

    match node.register_peers(&nodes) {
        Ok(count) => {
            let response = NodesResponse {
                message: "New nodes have been added".to_string(),
                total_nodes: node.peers(),
                count,
            };

            HttpResponse::Created().json(response)
        }
        Err(err) => error_response(&err),
    }
}

/// List registered peer nodes
#[utoipa::path(
    get,
    path = "/api/v1/nodes",
    responses(
        (status = 200, description = "Registered peers", body = NodesResponse)
    )
)]
pub async fn get_nodes(node: NodeData) -> impl Responder {
    let total_nodes = node.peers();

    HttpResponse::Ok().json(NodesResponse {
        message: "Registered nodes".to_string(),
        count: total_nodes.len(),
        total_nodes,
    })
}

/// Resolve conflicts with peers
///
/// Replaces the local chain with the longest valid chain among the peers
#[utoipa::path(
    get,
    path = "/api/v1/nodes/resolve",
    responses(
        (status = 200, description = "Resolution finished", body = ResolveResponse)
    )
)]
pub async fn resolve_conflicts(node: NodeData) -> impl Responder {
    let replaced = node.resolve_conflicts().await;

    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };

    HttpResponse::Ok().json(ResolveResponse {
        message: message.to_string(),
        replaced,
        chain: node.chain(),
    })
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair
///
/// The private key must be stored by your own
#[utoipa::path(
    post,
    path = "/api/v1/wallet/new",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();
    info!("Created wallet {}", wallet.address());

    HttpResponse::Created().json(WalletResponse {
        address: wallet.address().0.clone(),
        private_key: hex::encode(wallet.export_secret_key()),
    })
}

/// Sign a transaction
///
/// Returns the transaction with its signature, ready to be submitted
#[utoipa::path(
    post,
    path = "/api/v1/wallet/sign",
    request_body = SignRequest,
    responses(
        (status = 200, description = "Signed transaction", body = Transaction),
        (status = 400, description = "Invalid private key or sender")
    )
)]
pub async fn sign_transaction(sign_req: web::Json<SignRequest>) -> impl Responder {
    let request = sign_req.into_inner();

    let private_key_bytes = match hex::decode(&request.private_key) {
        Ok(bytes) => bytes,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid private key format. Must be a hex string."
            }));
        }
    };

    let wallet = match Wallet::from_secret_key(&private_key_bytes) {
        Ok(wallet) => wallet,
        Err(err) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Invalid private key: {}", err)
            }));
        }
    };

    let mut transaction = Transaction::new(Address(request.sender), Address(request.recipient), request.amount);

    match transaction.sign(&wallet) {
        Ok(()) => HttpResponse::Ok().json(transaction),
        Err(err) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Failed to sign transaction: {}", err)
        })),
    }
}
