//! Ledger integration tests
//!
//! End-to-end behaviour of the chain store, proof of work and UTXO resolver
//! against a real Sled database in a temporary directory.

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::{tempdir, TempDir};
use utxo_ledger::{
    Block, Blockchain, BlockchainError, ProofOfWork, Settings, Transaction, UTXOSet, SUBSIDY,
};

const TEST_BITS: u32 = 8;

fn settings_in(dir: &TempDir) -> Settings {
    Settings::new(dir.path().join("chain"), TEST_BITS).unwrap()
}

fn send(blockchain: &Blockchain, from: &str, to: &str, amount: u64) -> Result<Block, BlockchainError> {
    blockchain.send(from, to, amount)
}

fn collect_blocks(blockchain: &Blockchain) -> Vec<Block> {
    blockchain
        .iterator()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_payment_scenario() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();
    let utxo_set = UTXOSet::new(&blockchain);

    assert_eq!(utxo_set.find_balance("A").unwrap(), 20);

    send(&blockchain, "A", "B", 5).unwrap();
    assert_eq!(utxo_set.find_balance("A").unwrap(), 15);
    assert_eq!(utxo_set.find_balance("B").unwrap(), 5);
    assert_eq!(blockchain.get_chain_length().unwrap(), 2);

    let tip = blockchain.get_tip_hash();
    let err = send(&blockchain, "B", "A", 100).unwrap_err();
    assert_eq!(
        err,
        BlockchainError::InsufficientFunds {
            required: 100,
            available: 5
        }
    );
    assert_eq!(blockchain.get_chain_length().unwrap(), 2);
    assert_eq!(blockchain.get_tip_hash(), tip);
    assert_eq!(utxo_set.find_balance("B").unwrap(), 5);
}

#[test]
fn test_hash_link_integrity() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();

    send(&blockchain, "A", "B", 3).unwrap();
    send(&blockchain, "A", "C", 4).unwrap();
    send(&blockchain, "B", "C", 2).unwrap();

    let blocks = collect_blocks(&blockchain);
    assert_eq!(blocks.len(), 4);
    assert_eq!(blocks[0].get_hash(), blockchain.get_tip_hash().as_slice());
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].get_pre_block_hash(), pair[1].get_hash());
    }
    assert!(blocks[3].is_genesis());
    assert_eq!(blockchain.verify_chain().unwrap(), 4);
}

#[test]
fn test_every_block_meets_target() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();
    send(&blockchain, "A", "B", 1).unwrap();
    send(&blockchain, "A", "B", 1).unwrap();

    let target = ProofOfWork::target_for(TEST_BITS);
    for block in collect_blocks(&blockchain) {
        assert!(ProofOfWork::validate(&block));
        let pow = ProofOfWork::new_proof_of_work(&block);
        let hash = pow.hash_with_nonce(block.get_nonce());
        assert_eq!(hash, block.get_hash());
        assert!(num_bigint::BigUint::from_bytes_be(&hash) < target);
    }
}

#[test]
fn test_spend_once_across_payments() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();

    let payments = [
        ("A", "B", 7),
        ("B", "C", 3),
        ("A", "C", 6),
        ("C", "A", 9),
        ("B", "A", 4),
        ("A", "D", 20),
    ];
    let mut expected: HashMap<&str, u64> = HashMap::from([("A", SUBSIDY)]);
    for (from, to, amount) in payments {
        send(&blockchain, from, to, amount).unwrap();
        *expected.entry(from).or_default() -= amount;
        *expected.entry(to).or_default() += amount;
    }

    let utxo_set = UTXOSet::new(&blockchain);
    let mut total = 0;
    for address in ["A", "B", "C", "D"] {
        let unspent = utxo_set.find_unspent_outputs(address).unwrap();
        let sum: u64 = unspent.iter().map(|u| u.output.get_value()).sum();
        assert_eq!(sum, expected[address], "balance of {address}");
        total += sum;
    }
    // Only the genesis subsidy was ever minted
    assert_eq!(total, SUBSIDY);

    // No output reported unspent is referenced by any input on the chain
    let spent: Vec<(Vec<u8>, i64)> = collect_blocks(&blockchain)
        .iter()
        .flat_map(|b| b.get_transactions().to_vec())
        .filter(|tx| !tx.is_coinbase())
        .flat_map(|tx| {
            tx.get_vin()
                .iter()
                .map(|i| (i.get_txid().to_vec(), i.get_vout()))
                .collect::<Vec<_>>()
        })
        .collect();
    for address in ["A", "B", "C", "D"] {
        for utxo in utxo_set.find_unspent_outputs(address).unwrap() {
            assert!(!spent.contains(&(utxo.txid.clone(), utxo.index)));
        }
    }
}

#[test]
fn test_change_output_only_when_needed() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();

    let exact = send(&blockchain, "A", "B", SUBSIDY).unwrap();
    let tx = &exact.get_transactions()[0];
    assert_eq!(tx.get_vout().len(), 1);
    assert_eq!(tx.get_vin().len(), 1);
    assert!(tx.get_vin()[0].can_unlock_output_with("A"));

    let partial = send(&blockchain, "B", "C", 5).unwrap();
    let tx = &partial.get_transactions()[0];
    assert_eq!(tx.get_vout().len(), 2);
    assert!(tx.get_vout()[1].can_be_unlocked_with("B"));
    assert_eq!(tx.get_vout()[1].get_value(), SUBSIDY - 5);

    // Outputs always add up to the value of the spent inputs
    for block in collect_blocks(&blockchain) {
        for tx in block.get_transactions().iter().filter(|tx| !tx.is_coinbase()) {
            let spent: u64 = tx
                .get_vin()
                .iter()
                .map(|input| {
                    let source = blockchain.find_transaction(input.get_txid()).unwrap().unwrap();
                    source.get_vout()[input.get_vout() as usize].get_value()
                })
                .sum();
            assert_eq!(tx.get_output_value().unwrap(), spent);
        }
    }
}

#[test]
fn test_rejects_zero_and_empty_payments() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();

    assert!(matches!(
        send(&blockchain, "A", "B", 0),
        Err(BlockchainError::Transaction(_))
    ));
    assert!(matches!(
        send(&blockchain, "A", "", 1),
        Err(BlockchainError::InvalidAddress(_))
    ));
    assert_eq!(blockchain.get_chain_length().unwrap(), 1);
}

#[test]
fn test_blockchain_persistence() {
    let temp_dir = tempdir().unwrap();
    let settings = settings_in(&temp_dir);

    let tip = {
        let blockchain = Blockchain::create("A", &settings).unwrap();
        send(&blockchain, "A", "B", 5).unwrap();
        send(&blockchain, "B", "C", 2).unwrap();
        blockchain.get_tip_hash()
    };

    let blockchain = Blockchain::load(&settings).unwrap();
    assert_eq!(blockchain.get_tip_hash(), tip);
    assert_eq!(blockchain.get_chain_length().unwrap(), 3);

    let utxo_set = UTXOSet::new(&blockchain);
    assert_eq!(utxo_set.find_balance("A").unwrap(), 15);
    assert_eq!(utxo_set.find_balance("B").unwrap(), 3);
    assert_eq!(utxo_set.find_balance("C").unwrap(), 2);

    // Reloaded blocks are identical to what was written
    let reloaded = collect_blocks(&blockchain);
    for block in &reloaded {
        assert_eq!(Block::deserialize(&block.serialize().unwrap()).unwrap(), *block);
    }

    send(&blockchain, "C", "A", 1).unwrap();
    assert_eq!(blockchain.get_chain_length().unwrap(), 4);
}

#[test]
fn test_missing_chain() {
    let temp_dir = tempdir().unwrap();
    assert!(matches!(
        Blockchain::load(&settings_in(&temp_dir)),
        Err(BlockchainError::MissingChain(_))
    ));
}

#[test]
fn test_concurrent_appends_are_serialised() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let chain = blockchain.clone();
            thread::spawn(move || {
                let tx = Transaction::new_coinbase_tx("miner", &format!("round {i}")).unwrap();
                chain.mine_block(&[tx]).unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every block landed on the chain, none orphaned
    assert_eq!(blockchain.get_chain_length().unwrap(), 5);
    assert_eq!(blockchain.verify_chain().unwrap(), 5);
    assert_eq!(
        UTXOSet::new(&blockchain).find_balance("miner").unwrap(),
        4 * SUBSIDY
    );
}

#[test]
fn test_concurrent_sends_spend_once() {
    let temp_dir = tempdir().unwrap();
    let blockchain = Blockchain::open("A", &settings_in(&temp_dir)).unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["B", "C"]
        .into_iter()
        .map(|to| {
            let chain = blockchain.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                chain.send("A", to, 15)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Both want 15 of A's single 20 output; only one can have it
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(BlockchainError::InsufficientFunds {
            required: 15,
            available: 5
        })
    )));
    assert_eq!(blockchain.get_chain_length().unwrap(), 2);

    let utxo_set = UTXOSet::new(&blockchain);
    let total: u64 = ["A", "B", "C"]
        .iter()
        .map(|address| utxo_set.find_balance(address).unwrap())
        .sum();
    assert_eq!(total, SUBSIDY);
}
