//! Test utilities for chain testing

use crate::config::Settings;
use crate::core::Blockchain;
use crate::error::{BlockchainError, Result};
use tempfile::TempDir;

/// Low enough that mining a block takes a few hundred hashes
pub const TEST_TARGET_BITS: u32 = 8;

pub const TEST_ADDRESS: &str = "alice";

pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| BlockchainError::Io(e.to_string()))
}

/// Settings pointing at a not-yet-existing db inside `dir`
pub fn test_settings(dir: &TempDir) -> Settings {
    Settings {
        db_path: dir.path().join("chain"),
        target_bits: TEST_TARGET_BITS,
    }
}

/// Fresh chain whose genesis pays `TEST_ADDRESS`
pub fn create_test_blockchain() -> Result<(Blockchain, TempDir)> {
    let temp_dir = create_temp_dir()?;
    let blockchain = Blockchain::open(TEST_ADDRESS, &test_settings(&temp_dir))?;
    Ok((blockchain, temp_dir))
}
