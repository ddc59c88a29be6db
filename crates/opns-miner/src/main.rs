//! OpNS miner (`opns-miner`)
//!
//! Mines OpNS domains character by character, funding each claim from a
//! local queue of the funding key's unspent outputs.

use anyhow::Context;
use clap::Parser;
use opns_miner::config::{claim_byte, parse_prior, Args, Command, MinerConfig};
use opns_miner::{
    refresh_balance, DomainMiner, FileQueue, FundingContext, FundingEngine, HttpIndexer,
    PowEngine, PowReport,
};
use opns_core::validate_address;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = MinerConfig::from_args(&args)?;
    tracing::debug!(
        version = opns_miner::version(),
        network = %config.network,
        api = %config.api_url,
        threads = config.threads,
        "Starting"
    );

    match &args.command {
        Command::Pow { character, prior } => {
            let character = claim_byte(*character)?;
            let prior = parse_prior(prior)?;
            let result = PowEngine::new(config.threads).mine(&prior, character);
            println!("{}", serde_json::to_string(&PowReport::from(&result))?);
        }
        Command::Address => {
            let funding = funding_context(&args, &config)?;
            println!("{}", funding.address());
        }
        Command::Balance => {
            let funding = funding_context(&args, &config)?;
            let indexer = HttpIndexer::new(&config.api_url)?;
            let balance = refresh_balance(&indexer, &funding)?;
            println!("{}", balance);
        }
        Command::Mine { domain, owner } => {
            let funding = Arc::new(funding_context(&args, &config)?);
            let default_owner = args.default_owner_script(config.network)?;
            let owner_script = match owner {
                Some(address) => validate_address(address, config.network)
                    .with_context(|| format!("invalid owner address {}", address))?
                    .locking_script(),
                None => default_owner.clone(),
            };

            let mut miner = DomainMiner::new(
                HttpIndexer::new(&config.api_url)?,
                FundingEngine::new(funding),
                PowEngine::new(config.threads),
                default_owner,
            );

            let outcome = miner.mine_domain(domain, &owner_script);
            let stats = miner.stats();
            tracing::info!(
                characters = stats.characters_mined,
                hashes = stats.total_hashes,
                rate = %stats.format_hash_rate(),
                "Mining run finished"
            );

            match outcome {
                Ok(txid) => println!("{}", txid),
                Err(err) => {
                    if let Some(txid) = &err.last_txid {
                        tracing::error!(txid = %txid, "Last successful claim");
                    }
                    return Err(err.into());
                }
            }
        }
    }

    Ok(())
}

fn funding_context(args: &Args, config: &MinerConfig) -> anyhow::Result<FundingContext> {
    let queue = FileQueue::open(&config.queue_path)
        .with_context(|| format!("opening funding queue {}", config.queue_path.display()))?;
    let funding = FundingContext::from_wif(args.wif()?, config.network, Arc::new(queue), config.fees)?;
    Ok(funding)
}

fn init_tracing(verbosity: u8) {
    let mut filter = EnvFilter::from_default_env();

    // Only apply defaults if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        if let Ok(directive) = format!("opns_miner={}", level).parse() {
            filter = filter.add_directive(directive);
        }
        if let Ok(directive) = format!("opns_core={}", level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
