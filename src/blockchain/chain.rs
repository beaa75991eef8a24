use log::debug;

use super::block::Block;
use super::transaction::{Transaction, TransactionError, TransactionPool};

/// The committed chain of blocks together with its pool of pending transactions
///
/// A ledger always holds at least the genesis block. Blocks are only ever
/// appended through [`Ledger::new_block`]; the only other mutation is a
/// wholesale replacement of the chain after consensus.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pool: TransactionPool,
}

impl Ledger {
    /// Creates a new ledger holding only the genesis block
    pub fn new() -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            pool: TransactionPool::new(),
        }
    }

    /// Adds a transaction to the pool
    ///
    /// # Returns
    ///
    /// The index of the block the transaction will be included in
    pub fn new_transaction(&mut self, transaction: Transaction) -> Result<u64, TransactionError> {
        transaction.validate()?;

        let tip_index = self.tip().index;
        Ok(self.pool.add(transaction, tip_index))
    }

    /// Forges a new block from every pooled transaction and appends it
    ///
    /// When `previous_hash` is `None` it is computed from the current tip.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let tip = self.tip();
        let index = tip.index + 1;
        let previous_hash = previous_hash.unwrap_or_else(|| tip.hash());

        let block = Block::new(index, self.pool.drain(), proof, previous_hash);
        debug!("Appending block {} with {} transactions", block.index, block.transactions.len());

        self.chain.push(block.clone());
        block
    }

    /// The most recently committed block
    pub fn tip(&self) -> &Block {
        // The chain is never empty: it starts at genesis and replacements are checked
        &self.chain[self.chain.len() - 1]
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        self.pool.pending()
    }

    /// Swaps in a chain adopted from a peer
    ///
    /// Callers must only pass non-empty chains that passed validation.
    pub(crate) fn replace_chain(&mut self, chain: Vec<Block>) {
        if chain.is_empty() {
            return;
        }

        self.chain = chain;
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.tip().index, 1);
        assert_eq!(ledger.tip().previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(ledger.tip().proof, GENESIS_PROOF);
        assert!(ledger.tip().transactions.is_empty());
    }

    #[test]
    fn test_new_transaction_returns_next_index() {
        let mut ledger = Ledger::new();

        let index = ledger
            .new_transaction(Transaction::new("UserA".into(), "UserB".into(), 100.0))
            .unwrap();

        assert_eq!(index, 2);
        assert_eq!(ledger.pending_transactions().len(), 1);
        assert_eq!(ledger.pending_transactions()[0].amount, 100.0);
    }

    #[test]
    fn test_new_transaction_rejects_missing_fields() {
        let mut ledger = Ledger::new();

        let result = ledger.new_transaction(Transaction::new("".into(), "UserB".into(), 1.0));
        assert!(matches!(result, Err(TransactionError::MissingField("sender"))));
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn test_new_block_drains_pool_and_links_to_tip() {
        let mut ledger = Ledger::new();
        let genesis_hash = ledger.tip().hash();

        ledger.new_transaction(Transaction::new("A".into(), "B".into(), 5.0)).unwrap();
        let block = ledger.new_block(12345, None);

        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 12345);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(block.transactions.len(), 1);
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.tip(), &block);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_new_block_with_explicit_previous_hash() {
        let mut ledger = Ledger::new();
        let block = ledger.new_block(1, Some("explicit".to_string()));

        assert_eq!(block.previous_hash, "explicit");
    }

    #[test]
    fn test_replace_chain_keeps_pool() {
        let mut ledger = Ledger::new();
        ledger.new_transaction(Transaction::new("A".into(), "B".into(), 5.0)).unwrap();

        let mut other = Ledger::new();
        other.new_block(7, None);
        other.new_block(8, None);
        ledger.replace_chain(other.chain().to_vec());

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.tip().proof, 8);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }
}
