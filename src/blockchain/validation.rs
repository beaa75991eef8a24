use thiserror::Error;

use super::block::Block;
use super::pow::ProofOfWork;

/// Integrity failures found while walking a chain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Chain is empty")]
    Empty,

    #[error("Block {index} does not reference the hash of its predecessor")]
    BrokenLink { index: u64 },

    #[error("Block {index} carries an invalid proof of work")]
    InvalidProof { index: u64 },
}

/// Structural validation of whole chains, local or received from a peer
#[derive(Debug, Clone, Copy)]
pub struct ChainValidator {
    pow: ProofOfWork,
}

impl ChainValidator {
    pub fn new(pow: ProofOfWork) -> Self {
        ChainValidator { pow }
    }

    /// Walks consecutive block pairs and reports the first broken one
    ///
    /// Every block must store the hash of its predecessor and a proof that is
    /// valid after its predecessor's proof. A single block chain is valid.
    pub fn validate(&self, chain: &[Block]) -> Result<(), ChainError> {
        if chain.is_empty() {
            return Err(ChainError::Empty);
        }

        for pair in chain.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.previous_hash != previous.hash() {
                return Err(ChainError::BrokenLink { index: current.index });
            }

            if !self.pow.valid(previous.proof, current.proof) {
                return Err(ChainError::InvalidProof { index: current.index });
            }
        }

        Ok(())
    }

    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.validate(chain).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Ledger, Transaction};

    const DIFFICULTY: usize = 2;

    fn mined_chain(blocks: usize) -> Vec<Block> {
        let pow = ProofOfWork::new(DIFFICULTY);
        let mut ledger = Ledger::new();

        for n in 0..blocks {
            ledger
                .new_transaction(Transaction::new("A".into(), "B".into(), n as f64))
                .unwrap();
            let proof = pow.search(ledger.tip().proof);
            ledger.new_block(proof, None);
        }

        ledger.chain().to_vec()
    }

    #[test]
    fn test_single_block_chain_is_valid() {
        let validator = ChainValidator::new(ProofOfWork::new(DIFFICULTY));
        assert!(validator.is_valid(&[Block::genesis()]));
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let validator = ChainValidator::new(ProofOfWork::new(DIFFICULTY));
        assert_eq!(validator.validate(&[]), Err(ChainError::Empty));
    }

    #[test]
    fn test_mined_chain_is_valid() {
        let validator = ChainValidator::new(ProofOfWork::new(DIFFICULTY));
        assert!(validator.is_valid(&mined_chain(3)));
    }

    #[test]
    fn test_tampered_transactions_break_the_link() {
        let validator = ChainValidator::new(ProofOfWork::new(DIFFICULTY));
        let mut chain = mined_chain(3);

        chain[1].transactions[0].amount = 1_000.0;
        assert_eq!(validator.validate(&chain), Err(ChainError::BrokenLink { index: 3 }));
    }

    #[test]
    fn test_tampered_previous_hash_breaks_the_link() {
        let validator = ChainValidator::new(ProofOfWork::new(DIFFICULTY));
        let mut chain = mined_chain(3);

        chain[2].previous_hash = "0".repeat(64);
        assert_eq!(validator.validate(&chain), Err(ChainError::BrokenLink { index: 3 }));
    }

    #[test]
    fn test_tampered_proof_is_detected() {
        let pow = ProofOfWork::new(DIFFICULTY);
        let validator = ChainValidator::new(pow);
        let mut chain = mined_chain(2);

        // Tip proof replaced by one that fails the predicate; no later block links to it
        let previous_proof = chain[1].proof;
        chain[2].proof = (0..).find(|&p| !pow.valid(previous_proof, p)).unwrap();
        assert_eq!(validator.validate(&chain), Err(ChainError::InvalidProof { index: 3 }));

        // Altering an inner block's proof also breaks its successor's link
        let mut chain = mined_chain(3);
        chain[1].proof += 1;
        assert!(!validator.is_valid(&chain));
    }

    #[test]
    fn test_validator_uses_configured_difficulty() {
        let chain = mined_chain(3);
        let strict = ChainValidator::new(ProofOfWork::new(16));
        assert!(!strict.is_valid(&chain));
    }
}
