//! # UTXO Ledger - a single-node proof-of-work chain
//!
//! Blocks are hash-linked and stored in Sled keyed by their own hash, with a
//! sentinel key naming the tip. Value moves through transactions that spend
//! earlier outputs; balances are derived by walking the chain backwards.
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof of work and the chain store
//! - `storage/`: the UTXO resolver built on top of the chain walk
//! - `config/`: where the chain lives and how hard blocks are to mine
//! - `utils/`: SHA-256, timestamps and the bincode encoding
//! - `cli/`: command-line surface used by `main.rs`
//!
//! ## Typical flow
//! 1. `Blockchain::open` creates or loads the chain
//! 2. `UTXOSet` finds spendable outputs for the payer
//! 3. `Transaction::new_utxo_transaction` assembles the payment
//! 4. `Blockchain::mine_block` mines it and advances the tip

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Opt};
pub use config::{Settings, DEFAULT_TARGET_BITS};
pub use core::{
    Block, Blockchain, BlockchainIterator, ProofOfWork, TXInput, TXOutput, Transaction, SUBSIDY,
};
pub use error::{BlockchainError, Result};
pub use storage::{UTXOSet, UnspentOutput};
pub use utils::{current_timestamp, sha256_digest};
