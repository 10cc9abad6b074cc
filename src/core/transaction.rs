// This file implements the transaction model - how value moves through the ledger
// Outputs are locked to a plain identity string and inputs unlock them by naming the same identity
// There are no signatures here; the UTXO resolver is what keeps payments honest

use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use crate::utils::{deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::debug;
use serde::{Deserialize, Serialize};

/// Reward paid by a coinbase transaction
pub const SUBSIDY: u64 = 20;

// Output index carried by the coinbase input
const COINBASE_VOUT: i64 = -1;

// "Spend output #vout of transaction txid"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXInput {
    txid: Vec<u8>,      // Id of the transaction holding the output being spent
    vout: i64,          // Index of that output, -1 for coinbase
    script_sig: String, // Identity that unlocks the output, or reward memo for coinbase
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i64, script_sig: &str) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            script_sig: script_sig.to_string(),
        }
    }

    fn coinbase(memo: String) -> TXInput {
        TXInput {
            txid: vec![],
            vout: COINBASE_VOUT,
            script_sig: memo,
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_script_sig(&self) -> &str {
        self.script_sig.as_str()
    }

    pub fn is_coinbase_input(&self) -> bool {
        self.txid.is_empty() && self.vout == COINBASE_VOUT
    }

    pub fn can_unlock_output_with(&self, unlocking_data: &str) -> bool {
        self.script_sig == unlocking_data
    }
}

// "Pay value to whoever can present this identity"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: u64,
    script_pub_key: String,
}

impl TXOutput {
    pub fn new(value: u64, address: &str) -> Result<TXOutput> {
        if address.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Output must be locked to a non-empty address".to_string(),
            ));
        }

        Ok(TXOutput {
            value,
            script_pub_key: address.to_string(),
        })
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_script_pub_key(&self) -> &str {
        self.script_pub_key.as_str()
    }

    pub fn can_be_unlocked_with(&self, unlocking_data: &str) -> bool {
        self.script_pub_key == unlocking_data
    }
}

/// A transfer of value. The id is the SHA-256 of the encoded transaction with
/// the id field left empty, assigned once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    /// Reward transaction paying `SUBSIDY` to `to`. An empty memo becomes
    /// `Reward to '<to>'`.
    pub fn new_coinbase_tx(to: &str, memo: &str) -> Result<Transaction> {
        let memo = if memo.is_empty() {
            format!("Reward to '{to}'")
        } else {
            memo.to_string()
        };

        let txout = TXOutput::new(SUBSIDY, to)?;
        Transaction::new_payment(vec![TXInput::coinbase(memo)], vec![txout])
    }

    /// Assigns an id over caller-supplied inputs and outputs. No balance check
    /// happens here; that belongs to whoever selected the inputs.
    pub fn new_payment(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Pays `amount` from `from` to `to`, spending outputs picked by the
    /// resolver and returning any excess to `from` as change
    pub fn new_utxo_transaction(
        from: &str,
        to: &str,
        amount: u64,
        utxo_set: &UTXOSet,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::Transaction(
                "Amount must be positive".to_string(),
            ));
        }
        if from.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Sender address is empty".to_string(),
            ));
        }
        if to.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Recipient address is empty".to_string(),
            ));
        }

        let (accumulated, valid_outputs) = utxo_set.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, outs) in valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                BlockchainError::Transaction(format!("Invalid transaction ID: {e}"))
            })?;
            for out in outs {
                inputs.push(TXInput::new(&txid, out, from));
            }
        }

        let mut outputs = vec![TXOutput::new(amount, to)?];
        if accumulated > amount {
            outputs.push(TXOutput::new(accumulated - amount, from)?); // change
        }

        debug!(
            "Built payment of {amount} from {from} to {to} using {} inputs",
            inputs.len()
        );
        let tx = Transaction::new_payment(inputs, outputs)?;

        // Outputs must carry exactly the value of the spent inputs, no fee and no mint
        let output_value = tx.get_output_value()?;
        if output_value != accumulated {
            return Err(BlockchainError::Transaction(format!(
                "Payment outputs total {output_value} but inputs hold {accumulated}"
            )));
        }
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].is_coinbase_input()
    }

    fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for vout in &self.vout {
            total = total
                .checked_add(vout.get_value())
                .ok_or_else(|| BlockchainError::Transaction("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}
