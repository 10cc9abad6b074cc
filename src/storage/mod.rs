//! Derived views over the stored chain
//!
//! The UTXO set is recomputed from the blocks on every query; nothing here
//! is persisted separately.

pub mod utxo_set;

pub use utxo_set::{UTXOSet, UnspentOutput};
