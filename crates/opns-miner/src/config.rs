//! Command line and environment configuration.

use crate::error::{Error, Result};
use clap::{Parser, Subcommand};
use opns_core::network::DEFAULT_SATS_PER_KB;
use opns_core::{validate_address, Network, SatoshisPerKilobyte};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opns-miner", version, about = "OpNS domain miner")]
pub struct Args {
    /// Funding key (compressed WIF)
    #[arg(long, env = "WIF", hide_env_values = true)]
    pub wif: Option<String>,

    /// Address receiving inscriptions of intermediate prefixes
    #[arg(long, env = "OWNER_ADDRESS")]
    pub owner_address: Option<String>,

    /// mainnet or testnet
    #[arg(long, env = "OPNS_NETWORK", default_value = "mainnet")]
    pub network: String,

    /// Indexer API base URL (defaults per network)
    #[arg(long, env = "OPNS_API_URL")]
    pub api_url: Option<String>,

    /// Funding queue file
    #[arg(long, env = "OPNS_QUEUE", default_value = "./utxos.queue")]
    pub queue: PathBuf,

    /// Proof-of-work threads (defaults to the CPU count)
    #[arg(long, short, env = "OPNS_THREADS")]
    pub threads: Option<usize>,

    /// Fee rate in satoshis per kilobyte
    #[arg(long, env = "OPNS_SATS_PER_KB", default_value_t = DEFAULT_SATS_PER_KB)]
    pub sats_per_kb: u64,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mine every missing character of a domain
    Mine {
        domain: String,
        /// Final owner address (defaults to OWNER_ADDRESS)
        #[arg(long)]
        owner: Option<String>,
    },
    /// Reload the funding queue from the indexer and print the balance
    Balance,
    /// Search one proof-of-work and print it as JSON
    Pow {
        /// The character being claimed
        character: char,
        /// Parent proof-of-work as hex
        prior: String,
    },
    /// Print the funding address
    Address,
}

/// Settings resolved from [`Args`].
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub network: Network,
    pub api_url: String,
    pub queue_path: PathBuf,
    pub threads: usize,
    pub fees: SatoshisPerKilobyte,
}

impl MinerConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let network = Network::from_str(&args.network)
            .ok_or_else(|| Error::Config(format!("unknown network {:?}", args.network)))?;

        let api_url = args
            .api_url
            .clone()
            .unwrap_or_else(|| network.indexer_api_url().to_string());

        let threads = match args.threads {
            Some(0) => return Err(Error::Config("threads must be at least 1".into())),
            Some(n) => n,
            None => num_cpus::get(),
        };

        Ok(MinerConfig {
            network,
            api_url,
            queue_path: args.queue.clone(),
            threads,
            fees: SatoshisPerKilobyte::new(args.sats_per_kb),
        })
    }
}

impl Args {
    pub fn wif(&self) -> Result<&str> {
        self.wif
            .as_deref()
            .ok_or_else(|| Error::Config("WIF is required for this command".into()))
    }

    /// Locking script for inscriptions of intermediate prefixes.
    pub fn default_owner_script(&self, network: Network) -> Result<Vec<u8>> {
        let address = self
            .owner_address
            .as_deref()
            .ok_or_else(|| Error::Config("OWNER_ADDRESS is required for this command".into()))?;
        Ok(validate_address(address, network)?.locking_script())
    }
}

/// Parse a character into the single byte it claims.
pub fn claim_byte(character: char) -> Result<u8> {
    u8::try_from(character)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::Config(format!("{:?} is not an ASCII character", character)))
}

/// Parse a 32-byte parent proof-of-work from hex.
pub fn parse_prior(prior: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(prior).map_err(|e| Error::Config(format!("invalid prior: {}", e)))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| Error::Config(format!("prior must be 32 bytes, got {}", b.len())))
}
