//! A minimal proof-of-work ledger node.
//!
//! Blocks are linked by SHA-256 digests of their canonical JSON form, admitted
//! by a proof of work, and reconciled across peers by adopting the longest
//! valid chain. Transactions may carry Ed25519 signatures.

pub mod api;
pub mod blockchain;
pub mod config;
