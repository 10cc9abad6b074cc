//! Shared helpers for unit tests

pub mod test_utils;

pub use test_utils::{
    create_temp_dir, create_test_blockchain, test_settings, TEST_ADDRESS, TEST_TARGET_BITS,
};
