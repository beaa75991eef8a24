// Blockchain module
//
// This module contains the ledger core:
// - Canonical hashing
// - Block and transaction structures
// - The ledger and its transaction pool
// - Proof of work and chain validation
// - Longest-chain consensus across peers
// - Wallets for signing transactions
// - The node that ties them together

pub mod block;
pub mod chain;
pub mod consensus;
pub mod crypto;
pub mod hasher;
pub mod node;
pub mod pow;
pub mod transaction;
pub mod validation;

// Re-export main components for easier access
pub use block::Block;
pub use chain::Ledger;
pub use consensus::{ChainFetcher, ConsensusResolver, PeerRegistry, PeerResponse};
pub use crypto::{Address, DigitalSignature, Wallet};
pub use node::{Node, NodeError};
pub use pow::ProofOfWork;
pub use transaction::{Transaction, TransactionError, TransactionPool};
pub use validation::{ChainError, ChainValidator};
