//! Fixtures shared by the unit tests.

use crate::api::{AncestorOutput, Indexer, Txo};
use crate::error::{Error, Result};
use crate::funding::FundingContext;
use crate::queue::{FundingEntry, FundingQueue, MemoryQueue};
use opns_core::{Network, Outpoint, SatoshisPerKilobyte};
use parking_lot::Mutex;
use secp256k1::SecretKey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub const FUNDING_TXID: [u8; 32] = [0xf0; 32];

pub fn funding_entry(vout: u32, satoshis: u64) -> FundingEntry {
    FundingEntry::new(Outpoint::new(FUNDING_TXID, vout), satoshis)
}

pub fn funding_context(entries: &[FundingEntry]) -> Arc<FundingContext> {
    funding_context_with(Arc::new(MemoryQueue::with_entries(entries)))
}

pub fn funding_context_with(queue: Arc<dyn FundingQueue>) -> Arc<FundingContext> {
    let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
    Arc::new(FundingContext::new(secret, Network::Mainnet, queue, SatoshisPerKilobyte::default()))
}

/// Memory queue whose writes can be made to fail like a full disk.
#[derive(Debug, Default)]
pub struct FailingQueue {
    pub inner: MemoryQueue,
    pub fail_front: bool,
    pub fail_back: bool,
}

impl FailingQueue {
    pub fn with_entries(entries: &[FundingEntry]) -> Self {
        FailingQueue { inner: MemoryQueue::with_entries(entries), ..FailingQueue::default() }
    }

    fn disk_full() -> Error {
        Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }
}

impl FundingQueue for FailingQueue {
    fn pop_front(&self) -> Result<Option<FundingEntry>> {
        self.inner.pop_front()
    }

    fn push_front(&self, entries: &[FundingEntry]) -> Result<()> {
        if self.fail_front {
            return Err(Self::disk_full());
        }
        self.inner.push_front(entries)
    }

    fn push_back(&self, entries: &[FundingEntry]) -> Result<()> {
        if self.fail_back {
            return Err(Self::disk_full());
        }
        self.inner.push_back(entries)
    }

    fn replace(&self, entries: &[FundingEntry]) -> Result<()> {
        self.inner.replace(entries)
    }

    fn snapshot(&self) -> Result<Vec<FundingEntry>> {
        self.inner.snapshot()
    }
}

/// In-memory indexer recording every accepted broadcast.
#[derive(Debug, Default)]
pub struct MockIndexer {
    pub registered: HashSet<String>,
    pub ancestors: Mutex<HashMap<String, AncestorOutput>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
    /// Scripted outcomes for the next broadcasts; `None` accepts.
    pub outcomes: Mutex<VecDeque<Option<(u16, String)>>>,
    pub unspent: Vec<Txo>,
}

impl MockIndexer {
    pub fn with_ancestor(domain: &str, ancestor: AncestorOutput) -> Self {
        let indexer = MockIndexer::default();
        indexer.ancestors.lock().insert(domain.to_string(), ancestor);
        indexer
    }

    pub fn accept_next(&self) {
        self.outcomes.lock().push_back(None);
    }

    pub fn reject_next(&self, status: u16, message: &str) {
        self.outcomes.lock().push_back(Some((status, message.to_string())));
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().len()
    }
}

impl Indexer for MockIndexer {
    fn is_registered(&self, domain: &str) -> Result<bool> {
        Ok(self.registered.contains(domain))
    }

    fn mine_ancestor(&self, domain: &str) -> Result<AncestorOutput> {
        let ancestors = self.ancestors.lock();
        (0..=domain.len())
            .rev()
            .filter_map(|len| domain.get(..len))
            .find_map(|prefix| ancestors.get(prefix).cloned())
            .ok_or_else(|| Error::Config(format!("no ancestor for {}", domain)))
    }

    fn broadcast(&self, raw_tx: &[u8]) -> Result<()> {
        if let Some(Some((status, message))) = self.outcomes.lock().pop_front() {
            return Err(Error::BroadcastRejected { status, message });
        }

        self.broadcasts.lock().push(raw_tx.to_vec());
        Ok(())
    }

    fn unspent(&self, _address: &str) -> Result<Vec<Txo>> {
        Ok(self.unspent.clone())
    }
}
