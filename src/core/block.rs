use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    timestamp: i64,
    hash: Vec<u8>,
    transactions: Vec<Transaction>,
    pre_block_hash: Vec<u8>, // empty for genesis
    nonce: i64,
    target_bits: u32, // difficulty this block was mined at
}

impl Block {
    /// Stamps the current time, links to `pre_block_hash` and mines the block
    pub fn new_block(
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        target_bits: u32,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            timestamp: current_timestamp()?,
            hash: vec![],
            transactions: transactions.to_vec(),
            pre_block_hash,
            nonce: 0,
            target_bits,
        };

        info!(
            "Starting proof-of-work for block with {} transactions",
            block.transactions.len()
        );
        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block).run()?;
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Proof-of-work completed for block: {} (nonce: {nonce})",
            HEXLOWER.encode(&block.hash)
        );

        Ok(block)
    }

    pub fn generate_genesis_block(transaction: &Transaction, target_bits: u32) -> Result<Block> {
        Block::new_block(vec![], std::slice::from_ref(transaction), target_bits)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash)
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn get_target_bits(&self) -> u32 {
        self.target_bits
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    /// Digest over the concatenated transaction ids, in list order
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut txhashs = vec![];
        for transaction in &self.transactions {
            txhashs.extend(transaction.get_id());
        }

        sha256_digest(txhashs.as_slice())
    }

    /// Unmined block with a fixed timestamp (for testing only)
    #[cfg(test)]
    pub fn new_test_block(
        timestamp: i64,
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        target_bits: u32,
    ) -> Block {
        Block {
            timestamp,
            hash: vec![],
            transactions: transactions.to_vec(),
            pre_block_hash,
            nonce: 0,
            target_bits,
        }
    }

    #[cfg(test)]
    pub fn with_nonce(&self, nonce: i64) -> Block {
        let mut block = self.clone();
        block.nonce = nonce;
        block
    }
}
