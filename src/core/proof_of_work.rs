use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::BigUint;
use std::ops::ShlAssign;

const MAX_NONCE: i64 = i64::MAX;

/// Hash puzzle over a block's header material. A nonce is valid when
/// `sha256(prev_hash || hash_transactions || timestamp || target_bits || nonce)`,
/// read as a big-endian integer, is strictly below `2^(256 - target_bits)`.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigUint,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block) -> ProofOfWork<'a> {
        ProofOfWork {
            block,
            target: Self::target_for(block.get_target_bits()),
        }
    }

    pub fn target_for(target_bits: u32) -> BigUint {
        let mut target = BigUint::from(1u8);
        target.shl_assign(256u32.saturating_sub(target_bits));
        target
    }

    pub fn get_target(&self) -> &BigUint {
        &self.target
    }

    /// Re-derives the header digest at the block's own nonce and checks it
    /// against the target. The stored `hash` field is not consulted.
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block);
        let hash = pow.hash_with_nonce(block.get_nonce());
        pow.meets_target(&hash)
    }

    pub fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.block.get_pre_block_hash());
        data_bytes.extend(self.block.hash_transactions());
        data_bytes.extend(self.block.get_timestamp().to_be_bytes());
        data_bytes.extend(i64::from(self.block.get_target_bits()).to_be_bytes());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    pub fn hash_with_nonce(&self, nonce: i64) -> Vec<u8> {
        sha256_digest(self.prepare_data(nonce).as_slice())
    }

    pub fn meets_target(&self, hash: &[u8]) -> bool {
        BigUint::from_bytes_be(hash) < self.target
    }

    /// Sequential search from nonce 0; returns the first nonce that meets the target
    pub fn run(&self) -> Result<(i64, Vec<u8>)> {
        let target_bits = self.block.get_target_bits();
        info!("Mining the block (target bits: {target_bits})");

        let mut nonce = 0;
        while nonce < MAX_NONCE {
            let hash = self.hash_with_nonce(nonce);
            if self.meets_target(&hash) {
                debug!("Found nonce {nonce}: {}", HEXLOWER.encode(&hash));
                return Ok((nonce, hash));
            }
            nonce += 1;
        }

        Err(BlockchainError::Mining(format!(
            "Nonce space exhausted at {target_bits} target bits"
        )))
    }
}
