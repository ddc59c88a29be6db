//! Domain mining state machine.
//!
//! Mining `target` starts from the deepest covenant output whose domain is
//! a prefix of it and claims the remaining characters one transaction at a
//! time. Each claim spends the parent covenant output and creates:
//!
//! - vout 0: the parent restated with the character claimed
//! - vout 1: the child covenant for `domain || c`
//! - vout 2: the inscription binding `domain || c` to its owner
//! - change back to the funding identity
//!
//! The next claim spends vout 1 of the previous one.

use crate::api::Indexer;
use crate::error::{Error, MineDomainError, Result};
use crate::funding::FundingEngine;
use crate::pending::{CovenantUnlocker, PendingTransaction};
use crate::pow::{PowEngine, PowResult};
use crate::state::MiningStats;
use opns_core::covenant::{self, CovenantRecord};
use opns_core::network::COVENANT_SATOSHIS;
use opns_core::{build_inscription, Transaction, TxInput, TxOutput};
use tracing::{debug, info, warn};

/// Output index of the child covenant in a claim transaction.
pub const CHILD_VOUT: u32 = 1;

/// A character claimed and broadcast.
#[derive(Debug, Clone)]
pub struct MinedCharacter {
    pub txid: String,
    /// The child covenant, spendable by the next claim.
    pub child: CovenantRecord,
    pub pow: PowResult,
}

/// Position of a run between characters.
struct Progress {
    record: CovenantRecord,
    last_txid: Option<String>,
    stats: MiningStats,
}

/// Assemble the unfunded claim of `c` under `record`.
pub fn build_claim(
    record: &CovenantRecord,
    character: u8,
    pow: &PowResult,
    owner_script: &[u8],
) -> PendingTransaction {
    let mut tx = Transaction::new();
    tx.add_input(TxInput::new(
        record.location,
        COVENANT_SATOSHIS,
        record.locking_script.clone(),
    ));
    tx.add_output(TxOutput::new(COVENANT_SATOSHIS, record.restated_script(character, &pow.hash)));
    tx.add_output(TxOutput::new(COVENANT_SATOSHIS, record.child_script(character, &pow.hash)));
    tx.add_output(TxOutput::new(
        COVENANT_SATOSHIS,
        build_inscription(&record.child_domain(character), owner_script),
    ));

    let unlocker = CovenantUnlocker::new(character, pow.nonce, owner_script.to_vec());
    PendingTransaction::new(tx, Some(unlocker))
}

/// Mines domains for one funding identity.
///
/// Runs take `&mut self`, so one miner never has two chains in flight.
pub struct DomainMiner<I> {
    indexer: I,
    funding: FundingEngine,
    pow: PowEngine,
    default_owner: Vec<u8>,
    stats: MiningStats,
}

impl<I: Indexer> DomainMiner<I> {
    /// `default_owner` receives the inscriptions of intermediate prefixes.
    pub fn new(indexer: I, funding: FundingEngine, pow: PowEngine, default_owner: Vec<u8>) -> Self {
        DomainMiner { indexer, funding, pow, default_owner, stats: MiningStats::new() }
    }

    pub fn indexer(&self) -> &I {
        &self.indexer
    }

    pub fn funding(&self) -> &FundingEngine {
        &self.funding
    }

    pub fn stats(&self) -> &MiningStats {
        &self.stats
    }

    /// Mine every missing character of `target`, giving the final
    /// inscription to `owner_script`. Returns the txid of the last claim.
    pub fn mine_domain(&mut self, target: &str, owner_script: &[u8]) -> Result<String, MineDomainError> {
        let record = self.resolve(target)?;
        let suffix = &target.as_bytes()[record.domain.len()..];
        let last = suffix.len() - 1;

        info!(
            domain = target,
            ancestor = %record.domain_str(),
            location = %record.location,
            remaining = suffix.len(),
            "Mining domain"
        );

        let start = Progress { record, last_txid: None, stats: MiningStats::new() };
        let outcome = suffix.iter().enumerate().try_fold(start, |progress, (i, &c)| {
            let owner = if i == last { owner_script } else { self.default_owner.as_slice() };
            self.advance(progress, c, owner)
        });

        let (progress, failure) = match outcome {
            Ok(progress) => (progress, None),
            Err((progress, err)) => (progress, Some(err)),
        };

        self.absorb(&progress.stats);
        match (failure, progress.last_txid) {
            (None, Some(txid)) => {
                info!(domain = target, txid = %txid, "Domain mined");
                Ok(txid)
            }
            (None, None) => Err(Error::AlreadyMined(target.to_string()).into()),
            (Some(err), last_txid) => Err(MineDomainError::new(last_txid, err)),
        }
    }

    /// Look up the starting covenant for `target`.
    pub fn resolve(&self, target: &str) -> Result<CovenantRecord> {
        if self.indexer.is_registered(target)? {
            return Err(Error::AlreadyClaimed(target.to_string()));
        }

        let ancestor = self.indexer.mine_ancestor(target)?;
        let record = covenant::decode(&ancestor.script, ancestor.outpoint)?;

        if !target.as_bytes().starts_with(&record.domain) {
            return Err(Error::AncestorMismatch {
                domain: target.to_string(),
                ancestor: record.domain_str(),
            });
        }

        let Some(&next) = target.as_bytes().get(record.domain.len()) else {
            return Err(Error::AlreadyMined(target.to_string()));
        };

        if record.claimed.is_claimed(next) {
            return Err(Error::BranchClaimed {
                domain: record.domain_str(),
                character: char::from(next),
            });
        }

        Ok(record)
    }

    fn advance(
        &self,
        progress: Progress,
        character: u8,
        owner_script: &[u8],
    ) -> Result<Progress, (Progress, Error)> {
        match self.mine_character(&progress.record, character, owner_script) {
            Ok(mined) => {
                let mut stats = progress.stats;
                stats.record_pow(&mined.pow);
                stats.record_claim(&mined.txid);
                Ok(Progress { record: mined.child, last_txid: Some(mined.txid), stats })
            }
            Err(err) => Err((progress, err)),
        }
    }

    /// Claim one character under `record` and broadcast it.
    pub fn mine_character(
        &self,
        record: &CovenantRecord,
        character: u8,
        owner_script: &[u8],
    ) -> Result<MinedCharacter> {
        debug!(
            domain = %record.domain_str(),
            character = %char::from(character),
            "Searching proof-of-work"
        );
        let pow = self.pow.mine(&record.pow, character);

        let mut pending = build_claim(record, character, &pow, owner_script);
        self.funding.fund_and_sign(&mut pending)?;

        if let Err(err) = pending.unlock_covenant() {
            return Err(self.abandon(&mut pending, err));
        }

        let child = match covenant::decode(
            &pending.tx.outputs[CHILD_VOUT as usize].locking_script,
            pending.tx.outpoint(CHILD_VOUT),
        ) {
            Ok(child) => child,
            Err(err) => return Err(self.abandon(&mut pending, err.into())),
        };

        let raw = pending.raw();
        let txid = pending.txid_hex();
        if let Err(err) = self.indexer.broadcast(&raw) {
            warn!(txid = %txid, rawtx = %hex::encode(&raw), error = %err, "Broadcast failed");
            return Err(self.abandon(&mut pending, err));
        }

        // The claim is on chain from here; a queue failure only loses change.
        if let Err(err) = self.funding.settle(&pending) {
            warn!(txid = %txid, error = %err, "Could not queue change, refresh the balance to recover it");
        }

        info!(
            domain = %child.domain_str(),
            txid = %txid,
            hashes = pow.attempts,
            "Mined character"
        );
        Ok(MinedCharacter { txid, child, pow })
    }

    /// Give the funding inputs of an unbroadcast claim back to the queue
    /// and pass `err` through.
    fn abandon(&self, pending: &mut PendingTransaction, err: Error) -> Error {
        if let Err(requeue) = self.funding.return_inputs(pending) {
            warn!(error = %requeue, "Could not return funding inputs to queue");
        }
        err
    }

    fn absorb(&mut self, run: &MiningStats) {
        self.stats.total_hashes += run.total_hashes;
        self.stats.elapsed_ms += run.elapsed_ms;
        self.stats.characters_mined += run.characters_mined;
        if run.last_txid.is_some() {
            self.stats.last_txid = run.last_txid.clone();
        }
        self.stats.update_hash_rate();
    }
}
