use crate::config::Settings;
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "utxo-ledger", arg_required_else_help = true)]
pub struct Opt {
    #[arg(
        long = "db-path",
        global = true,
        help = "Where the chain database lives (overrides LEDGER_DB_PATH)"
    )]
    pub db_path: Option<PathBuf>,
    #[arg(
        long = "target-bits",
        global = true,
        help = "Leading zero bits a block hash needs (overrides LEDGER_TARGET_BITS)"
    )]
    pub target_bits: Option<u32>,
    #[command(subcommand)]
    pub command: Command,
}

impl Opt {
    /// Layers the CLI overrides on top of file and environment settings
    pub fn settings(&self, base: Settings) -> Result<Settings> {
        let mut settings = base;
        if let Some(path) = &self.db_path {
            settings = settings.with_db_path(path);
        }
        if let Some(bits) = self.target_bits {
            settings = settings.with_target_bits(bits)?;
        }
        Ok(settings)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "createchain",
        alias = "createblockchain",
        about = "Create a blockchain and send the genesis reward to ADDRESS"
    )]
    Createchain {
        #[arg(help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(name = "printchain", about = "Print all blocks from tip to genesis")]
    Printchain,
    #[command(name = "getbalance", about = "Get the balance of ADDRESS")]
    GetBalance {
        #[arg(help = "The address to get balance for")]
        address: String,
    },
    #[command(name = "send", about = "Send AMOUNT of coins from FROM to TO")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination wallet address")]
        to: String,
        #[arg(
            help = "Amount to send",
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        amount: u64,
    },
}
