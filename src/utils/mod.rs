//! Utility functions and helpers
//!
//! Hashing, timestamps and the deterministic byte encoding shared by
//! transactions, blocks and the chain store.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest};

pub use serialization::{deserialize, serialize};
