use crate::core::{Blockchain, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One spendable output and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub txid: Vec<u8>,
    pub index: i64,
    pub output: TXOutput,
}

/// Resolves unspent outputs by walking the chain from tip to genesis.
///
/// Spends are gathered as the walk goes. A transaction can only spend outputs
/// from earlier blocks or from earlier in its own block, so by the time an
/// output is examined every input that could reference it has been seen, as
/// long as each block's inputs are recorded before its outputs are checked.
pub struct UTXOSet<'a> {
    blockchain: &'a Blockchain,
}

impl<'a> UTXOSet<'a> {
    pub fn new(blockchain: &'a Blockchain) -> UTXOSet<'a> {
        UTXOSet { blockchain }
    }

    // Transactions holding outputs locked to `address` that are still unspent,
    // paired with those output indices, newest block first
    fn scan(&self, address: &str) -> Result<Vec<(Transaction, Vec<i64>)>> {
        let mut unspent = vec![];
        let mut spent_txos: HashMap<String, HashSet<i64>> = HashMap::new();

        for block in self.blockchain.iterator() {
            let block = block?;

            for tx in block.get_transactions() {
                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    spent_txos
                        .entry(HEXLOWER.encode(txin.get_txid()))
                        .or_default()
                        .insert(txin.get_vout());
                }
            }

            for tx in block.get_transactions() {
                let spent = spent_txos.get(&HEXLOWER.encode(tx.get_id()));
                let indices: Vec<i64> = tx
                    .get_vout()
                    .iter()
                    .enumerate()
                    .map(|(idx, out)| (idx as i64, out))
                    .filter(|(idx, out)| {
                        out.can_be_unlocked_with(address)
                            && !spent.is_some_and(|spent| spent.contains(idx))
                    })
                    .map(|(idx, _)| idx)
                    .collect();

                if !indices.is_empty() {
                    unspent.push((tx.clone(), indices));
                }
            }
        }
        Ok(unspent)
    }

    /// Transactions that still hold at least one unspent output for `address`
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self.scan(address)?.into_iter().map(|(tx, _)| tx).collect())
    }

    pub fn find_unspent_outputs(&self, address: &str) -> Result<Vec<UnspentOutput>> {
        let mut utxos = vec![];
        for (tx, indices) in self.scan(address)? {
            for index in indices {
                utxos.push(UnspentOutput {
                    txid: tx.get_id().to_vec(),
                    index,
                    output: tx.get_vout()[index as usize].clone(),
                });
            }
        }
        Ok(utxos)
    }

    pub fn find_balance(&self, address: &str) -> Result<u64> {
        let mut balance = 0u64;
        for utxo in self.find_unspent_outputs(address)? {
            balance = balance
                .checked_add(utxo.output.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Balance overflow".to_string()))?;
        }
        Ok(balance)
    }

    /// First-fit selection in walk order, stopping once `amount` is covered.
    /// Returns the accumulated value and the chosen output indices per txid (hex).
    /// The accumulated value is below `amount` when the address cannot cover it.
    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, BTreeMap<String, Vec<i64>>)> {
        let mut unspent_outputs: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        let mut accumulated = 0u64;

        for utxo in self.find_unspent_outputs(address)? {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated
                .checked_add(utxo.output.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Input value overflow".to_string()))?;
            unspent_outputs
                .entry(HEXLOWER.encode(&utxo.txid))
                .or_default()
                .push(utxo.index);
        }

        debug!("Selected {accumulated} of requested {amount} for {address}");
        Ok((accumulated, unspent_outputs))
    }
}
