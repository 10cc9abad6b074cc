// Entry point for the ledger CLI
// Each subcommand maps onto one chain store or UTXO resolver call
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, LevelFilter};
use std::process;
use utxo_ledger::{Blockchain, Command, Opt, ProofOfWork, Settings, UTXOSet};

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    // clap prints usage and exits non-zero on missing or malformed arguments
    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let settings = opt.settings(Settings::load()?)?;

    match opt.command {
        Command::Createchain { address } => {
            let blockchain = Blockchain::create(&address, &settings)?;
            println!(
                "Done! Genesis block: {}",
                HEXLOWER.encode(&blockchain.get_tip_hash())
            );
        }
        Command::GetBalance { address } => {
            let blockchain = Blockchain::load(&settings)?;
            let balance = UTXOSet::new(&blockchain).find_balance(&address)?;
            println!("Balance of '{address}': {balance}");
        }
        Command::Send { from, to, amount } => {
            let blockchain = Blockchain::load(&settings)?;
            blockchain.send(&from, &to, amount)?;
            println!("Success!");
        }
        Command::Printchain => {
            let blockchain = Blockchain::load(&settings)?;
            for block in blockchain.iterator() {
                let block = block?;
                println!("Prev. hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
                println!("Hash: {}", block.get_hash_hex());
                println!("Timestamp: {}", block.get_timestamp());
                println!("Nonce: {}", block.get_nonce());
                println!("PoW: {}", ProofOfWork::validate(&block));

                for tx in block.get_transactions() {
                    println!("- Transaction {}", HEXLOWER.encode(tx.get_id()));
                    for input in tx.get_vin() {
                        if input.is_coinbase_input() {
                            println!("-- Coinbase: {}", input.get_script_sig());
                        } else {
                            println!(
                                "-- Input txid = {}, vout = {}, from = {}",
                                HEXLOWER.encode(input.get_txid()),
                                input.get_vout(),
                                input.get_script_sig(),
                            );
                        }
                    }
                    for output in tx.get_vout() {
                        println!(
                            "-- Output value = {}, to = {}",
                            output.get_value(),
                            output.get_script_pub_key(),
                        );
                    }
                }
                println!();
            }
        }
    }
    Ok(())
}
