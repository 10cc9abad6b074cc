//! Core ledger functionality
//!
//! Blocks, transactions, the proof-of-work puzzle and the persisted chain.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator};
pub use proof_of_work::ProofOfWork;
pub use transaction::{TXInput, TXOutput, Transaction, SUBSIDY};
