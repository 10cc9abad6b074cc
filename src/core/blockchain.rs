// This is the chain store - blocks live in Sled keyed by their own hash
// A single sentinel key holds the tip, and the chain is walked backwards from there
// Nothing is ever held in memory as a forward list

use crate::config::Settings;
use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use data_encoding::HEXLOWER;
use log::{debug, info};
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

const TIP_BLOCK_HASH_KEY: &str = "l"; // Key holding the hash of the latest block
const BLOCKS_TREE: &str = "blocks";

/// Handle to a persisted chain. Clones share the database, the cached tip
/// and the append lock, so appends through any clone are serialised.
#[derive(Clone)]
pub struct Blockchain {
    tip_hash: Arc<RwLock<Vec<u8>>>,
    // Held across read-tip / mine / write so two appenders never mine on the same tip
    append_lock: Arc<Mutex<()>>,
    db: Db,
    db_path: PathBuf,
    target_bits: u32,
}

impl Blockchain {
    /// Loads the chain at `settings.db_path`, creating it with a genesis block
    /// paying `genesis_address` if nothing is persisted there yet
    pub fn open(genesis_address: &str, settings: &Settings) -> Result<Blockchain> {
        let (db, blocks_tree) = Self::open_db(&settings.db_path)?;

        let tip_hash = match Self::read_tip(&blocks_tree)? {
            Some(tip_hash) => tip_hash,
            None => Self::init_genesis(&blocks_tree, genesis_address, settings.target_bits)?,
        };
        db.flush()?;

        Ok(Self::from_parts(db, tip_hash, settings))
    }

    /// Like [`Blockchain::open`], but refuses to reuse an existing chain
    pub fn create(genesis_address: &str, settings: &Settings) -> Result<Blockchain> {
        let (db, blocks_tree) = Self::open_db(&settings.db_path)?;

        if Self::read_tip(&blocks_tree)?.is_some() {
            return Err(BlockchainError::ChainExists(
                settings.db_path.display().to_string(),
            ));
        }
        let tip_hash = Self::init_genesis(&blocks_tree, genesis_address, settings.target_bits)?;
        db.flush()?;

        Ok(Self::from_parts(db, tip_hash, settings))
    }

    /// Opens an existing chain; never creates one
    pub fn load(settings: &Settings) -> Result<Blockchain> {
        let missing = || BlockchainError::MissingChain(settings.db_path.display().to_string());

        if !settings.db_path.exists() {
            return Err(missing());
        }
        let (db, blocks_tree) = Self::open_db(&settings.db_path)?;
        let tip_hash = Self::read_tip(&blocks_tree)?.ok_or_else(missing)?;

        Ok(Self::from_parts(db, tip_hash, settings))
    }

    fn from_parts(db: Db, tip_hash: Vec<u8>, settings: &Settings) -> Blockchain {
        Blockchain {
            tip_hash: Arc::new(RwLock::new(tip_hash)),
            append_lock: Arc::new(Mutex::new(())),
            db,
            db_path: settings.db_path.clone(),
            target_bits: settings.target_bits,
        }
    }

    fn open_db(path: &Path) -> Result<(Db, Tree)> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks_tree = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok((db, blocks_tree))
    }

    fn read_tip(blocks_tree: &Tree) -> Result<Option<Vec<u8>>> {
        let data = blocks_tree
            .get(TIP_BLOCK_HASH_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to get tip hash: {e}")))?;
        Ok(data.map(|tip| tip.to_vec()))
    }

    fn init_genesis(blocks_tree: &Tree, genesis_address: &str, target_bits: u32) -> Result<Vec<u8>> {
        info!("Creating genesis block for address: {genesis_address}");
        let coinbase_tx = Transaction::new_coinbase_tx(genesis_address, "")?;
        let block = Block::generate_genesis_block(&coinbase_tx, target_bits)?;
        Self::update_blocks_tree(blocks_tree, &block)?;
        Ok(block.get_hash().to_vec())
    }

    // Block and tip go in one transaction so a mined block is never left unlinked
    fn update_blocks_tree(blocks_tree: &Tree, block: &Block) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        blocks_tree
            .transaction(|tx_db| {
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok(())
            })
            .map_err(|e: TransactionError| {
                BlockchainError::Database(format!("Failed to update blocks tree: {e}"))
            })?;

        Ok(())
    }

    fn blocks_tree(&self) -> Result<Tree> {
        self.db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))
    }

    pub fn get_target_bits(&self) -> u32 {
        self.target_bits
    }

    pub fn get_tip_hash(&self) -> Vec<u8> {
        self.tip_hash
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_tip_hash(&self, new_tip_hash: &[u8]) {
        let mut tip_hash = self
            .tip_hash
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *tip_hash = new_tip_hash.to_vec();
    }

    // Writes are atomic, so a panic while holding the lock leaves nothing to repair
    fn lock_appends(&self) -> MutexGuard<'_, ()> {
        self.append_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a block holding `transactions` on top of the persisted tip
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Block> {
        let _guard = self.lock_appends();
        self.append(transactions)
    }

    /// Pays `amount` from `from` to `to` and mines the payment in its own block.
    /// Output selection happens under the append lock, so concurrent payments
    /// from the same sender never pick the same output.
    pub fn send(&self, from: &str, to: &str, amount: u64) -> Result<Block> {
        let _guard = self.lock_appends();
        let utxo_set = UTXOSet::new(self);
        let transaction = Transaction::new_utxo_transaction(from, to, amount, &utxo_set)?;
        self.append(&[transaction])
    }

    // Caller must hold the append lock
    fn append(&self, transactions: &[Transaction]) -> Result<Block> {
        let blocks_tree = self.blocks_tree()?;
        let tip_hash = Self::read_tip(&blocks_tree)?.ok_or_else(|| {
            BlockchainError::MissingChain(self.db_path.display().to_string())
        })?;

        info!(
            "Mining block on top of {} with {} transactions",
            HEXLOWER.encode(&tip_hash),
            transactions.len()
        );
        let block = Block::new_block(tip_hash, transactions, self.target_bits)?;

        Self::update_blocks_tree(&blocks_tree, &block)?;
        self.db.flush()?;
        self.set_tip_hash(block.get_hash());

        info!("Successfully mined block: {}", block.get_hash_hex());
        Ok(block)
    }

    pub fn iterator(&self) -> BlockchainIterator {
        BlockchainIterator::new(self.get_tip_hash(), self.db.clone())
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        let block_tree = self.blocks_tree()?;

        if let Some(block_bytes) = block_tree
            .get(block_hash)
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
        {
            let block = Block::deserialize(block_bytes.as_ref())?;
            return Ok(Some(block));
        }
        Ok(None)
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            if let Some(transaction) = block
                .get_transactions()
                .iter()
                .find(|transaction| transaction.get_id() == txid)
            {
                return Ok(Some(transaction.clone()));
            }
        }
        Ok(None)
    }

    /// Number of blocks from tip back to genesis, inclusive
    pub fn get_chain_length(&self) -> Result<usize> {
        let mut length = 0;
        for block in self.iterator() {
            block?;
            length += 1;
        }
        Ok(length)
    }

    /// Walks tip to genesis checking every block's proof of work, stored hash,
    /// difficulty and link to its successor. Returns the number of blocks checked.
    pub fn verify_chain(&self) -> Result<usize> {
        let mut expected_hash = self.get_tip_hash();
        let mut checked = 0;

        for block in self.iterator() {
            let block = block?;
            let block_hex = block.get_hash_hex();

            if block.get_hash() != expected_hash.as_slice() {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Block {block_hex} is stored under {}",
                    HEXLOWER.encode(&expected_hash)
                )));
            }
            if block.get_target_bits() != self.target_bits {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Block {block_hex} was mined at {} target bits, chain requires {}",
                    block.get_target_bits(),
                    self.target_bits
                )));
            }

            let pow = ProofOfWork::new_proof_of_work(&block);
            if pow.hash_with_nonce(block.get_nonce()) != block.get_hash() {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Block {block_hex} hash does not match its header"
                )));
            }
            if !ProofOfWork::validate(&block) {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Block {block_hex} does not meet its proof-of-work target"
                )));
            }

            debug!("Verified block {block_hex}");
            expected_hash = block.get_pre_block_hash().to_vec();
            checked += 1;
        }

        Ok(checked)
    }
}

/// Cursor from the tip back to genesis. Yields each block once; a block that
/// cannot be loaded is reported as an error and ends the walk.
pub struct BlockchainIterator {
    db: Db,
    current_hash: Vec<u8>,
}

impl BlockchainIterator {
    fn new(tip_hash: Vec<u8>, db: Db) -> BlockchainIterator {
        BlockchainIterator {
            current_hash: tip_hash,
            db,
        }
    }

    fn load_current(&self) -> Result<Block> {
        let block_tree = self
            .db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        let data = block_tree
            .get(&self.current_hash)
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
            .ok_or_else(|| {
                BlockchainError::Database(format!(
                    "Block {} not found",
                    HEXLOWER.encode(&self.current_hash)
                ))
            })?;
        Block::deserialize(data.as_ref())
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        // An empty hash is the genesis block's predecessor
        if self.current_hash.is_empty() {
            return None;
        }

        match self.load_current() {
            Ok(block) => {
                self.current_hash = block.get_pre_block_hash().to_vec();
                Some(Ok(block))
            }
            Err(e) => {
                self.current_hash.clear();
                Some(Err(e))
            }
        }
    }
}
