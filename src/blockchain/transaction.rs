use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::{self, Address, DigitalSignature, Wallet};
use super::hasher;

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Missing value: {0}")]
    MissingField(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid Transaction (Signature Fail)")]
    InvalidSignature,

    #[error("Transaction not signed")]
    NotSigned,

    #[error("Transaction already signed")]
    AlreadySigned,

    #[error("Invalid sender address: {0}")]
    InvalidSenderAddress(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Represents a transaction recorded in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address ("0" for mining rewards)
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Hex encoded signature over the signing payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<DigitalSignature>,
}

/// The fields covered by a signature
#[derive(Serialize)]
struct SigningPayload<'a> {
    sender: &'a Address,
    recipient: &'a Address,
    amount: f64,
}

impl Transaction {
    /// Creates a new unsigned transaction
    pub fn new(sender: Address, recipient: Address, amount: f64) -> Self {
        Transaction {
            sender,
            recipient,
            amount,
            signature: None,
        }
    }

    /// Creates a mining reward transaction paid out by the system address
    pub fn reward(recipient: Address, amount: f64) -> Self {
        Transaction::new(Address(Address::SYSTEM.to_string()), recipient, amount)
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender.is_system()
    }

    /// Checks the shape of the transaction
    ///
    /// Sender and recipient must be non-empty and the amount a finite number.
    /// Positivity of the amount is not enforced.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.sender.0.trim().is_empty() {
            return Err(TransactionError::MissingField("sender"));
        }

        if self.recipient.0.trim().is_empty() {
            return Err(TransactionError::MissingField("recipient"));
        }

        if !self.amount.is_finite() {
            return Err(TransactionError::InvalidAmount(self.amount.to_string()));
        }

        Ok(())
    }

    /// The canonical bytes a signature is computed over
    pub fn signing_payload(&self) -> Result<Vec<u8>, TransactionError> {
        let payload = SigningPayload {
            sender: &self.sender,
            recipient: &self.recipient,
            amount: self.amount,
        };

        Ok(hasher::canonical_bytes(&payload)?)
    }

    /// Signs the transaction with a wallet
    pub fn sign(&mut self, wallet: &Wallet) -> Result<(), TransactionError> {
        if self.signature.is_some() {
            return Err(TransactionError::AlreadySigned);
        }

        if wallet.address() != &self.sender {
            return Err(TransactionError::InvalidSenderAddress(
                "Wallet address does not match sender address".to_string(),
            ));
        }

        self.signature = Some(wallet.sign(&self.signing_payload()?));

        Ok(())
    }

    /// Verifies the transaction's signature against the sender's public key
    pub fn verify_signature(&self) -> Result<(), TransactionError> {
        let signature = self.signature.as_ref().ok_or(TransactionError::NotSigned)?;

        if crypto::verify(&self.signing_payload()?, signature, &self.sender.0) {
            Ok(())
        } else {
            Err(TransactionError::InvalidSignature)
        }
    }
}

/// Ordered pool of transactions waiting for the next block
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transaction to the pool
    ///
    /// # Returns
    ///
    /// The index of the block the transaction lands in if that block is mined next
    pub fn add(&mut self, transaction: Transaction, tip_index: u64) -> u64 {
        self.pending.push(transaction);
        tip_index + 1
    }

    /// Empties the pool, returning its contents in submission order
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let transaction = Transaction::new("A".into(), "B".into(), 10.0);

        assert_eq!(transaction.sender.0, "A");
        assert_eq!(transaction.recipient.0, "B");
        assert_eq!(transaction.amount, 10.0);
        assert!(transaction.signature.is_none());
        assert!(!transaction.is_reward());
        assert!(transaction.validate().is_ok());
    }

    #[test]
    fn test_reward_transaction() {
        let transaction = Transaction::reward("miner".into(), 1.0);

        assert_eq!(transaction.sender.0, "0");
        assert!(transaction.is_reward());
    }

    #[test]
    fn test_validate_rejects_empty_parties() {
        let missing_sender = Transaction::new("".into(), "B".into(), 1.0);
        assert!(matches!(missing_sender.validate(), Err(TransactionError::MissingField("sender"))));

        let missing_recipient = Transaction::new("A".into(), "  ".into(), 1.0);
        assert!(matches!(missing_recipient.validate(), Err(TransactionError::MissingField("recipient"))));

        let nan = Transaction::new("A".into(), "B".into(), f64::NAN);
        assert!(matches!(nan.validate(), Err(TransactionError::InvalidAmount(_))));
    }

    #[test]
    fn test_validate_allows_non_positive_amounts() {
        assert!(Transaction::new("A".into(), "B".into(), 0.0).validate().is_ok());
        assert!(Transaction::new("A".into(), "B".into(), -5.0).validate().is_ok());
    }

    #[test]
    fn test_sign_transaction() {
        let sender = Wallet::new();
        let recipient = Wallet::new();

        let mut transaction = Transaction::new(sender.address().clone(), recipient.address().clone(), 10.5);
        transaction.sign(&sender).unwrap();

        assert!(transaction.signature.is_some());
        assert!(transaction.verify_signature().is_ok());
        assert!(matches!(transaction.sign(&sender), Err(TransactionError::AlreadySigned)));
    }

    #[test]
    fn test_sign_requires_matching_wallet() {
        let sender = Wallet::new();
        let other = Wallet::new();

        let mut transaction = Transaction::new(sender.address().clone(), "B".into(), 1.0);
        assert!(matches!(
            transaction.sign(&other),
            Err(TransactionError::InvalidSenderAddress(_))
        ));
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let sender = Wallet::new();
        let mut transaction = Transaction::new(sender.address().clone(), "B".into(), 10.0);
        transaction.sign(&sender).unwrap();

        transaction.amount = 1000.0;
        assert!(matches!(transaction.verify_signature(), Err(TransactionError::InvalidSignature)));
    }

    #[test]
    fn test_unsigned_transaction_reports_not_signed() {
        let transaction = Transaction::new("A".into(), "B".into(), 1.0);
        assert!(matches!(transaction.verify_signature(), Err(TransactionError::NotSigned)));
    }

    #[test]
    fn test_signing_payload_excludes_signature() {
        let sender = Wallet::new();
        let mut transaction = Transaction::new(sender.address().clone(), "B".into(), 3.0);
        let before = transaction.signing_payload().unwrap();

        transaction.sign(&sender).unwrap();
        assert_eq!(transaction.signing_payload().unwrap(), before);
    }

    #[test]
    fn test_signature_omitted_from_json_when_absent() {
        let transaction = Transaction::new("A".into(), "B".into(), 10.0);
        let json = serde_json::to_value(&transaction).unwrap();

        assert_eq!(json, serde_json::json!({"sender": "A", "recipient": "B", "amount": 10.0}));
    }

    #[test]
    fn test_pool_add_and_drain() {
        let mut pool = TransactionPool::new();

        assert_eq!(pool.add(Transaction::new("A".into(), "B".into(), 1.0), 1), 2);
        assert_eq!(pool.add(Transaction::new("C".into(), "D".into(), 2.0), 1), 2);
        assert_eq!(pool.len(), 2);

        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].sender.0, "A");
        assert_eq!(drained[1].sender.0, "C");
        assert!(pool.is_empty());
        assert!(pool.drain().is_empty());
    }
}
