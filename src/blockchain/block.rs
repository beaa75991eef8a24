use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::hasher;
use super::transaction::Transaction;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Previous hash stored in the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Represents a block in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// 1-based position of the block in the chain
    pub index: u64,

    /// Timestamp when the block was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    /// Transactions pooled at the time the block was forged
    pub transactions: Vec<Transaction>,

    /// Proof of work relative to the previous block's proof
    pub proof: u64,

    /// Hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: Utc::now(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Creates the first block of every chain
    pub fn genesis() -> Self {
        Block::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Calculates the hash of the block
    pub fn hash(&self) -> String {
        hasher::digest(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block() {
        let transactions = vec![
            Transaction::reward("recipient1".into(), 10.0),
            Transaction::reward("recipient2".into(), 20.0),
        ];

        let block = Block::new(2, transactions, 100, "previous_hash".to_string());

        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 100);
        assert_eq!(block.previous_hash, "previous_hash");
        assert_eq!(block.transactions.len(), 2);
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();

        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
    }

    #[test]
    fn test_hash_survives_json_round_trip() {
        let block = Block::new(
            2,
            vec![Transaction::new("A".into(), "B".into(), 10.25)],
            35293,
            Block::genesis().hash(),
        );

        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }
}
