//! The funding queue: spendable outputs of the funding identity.
//!
//! Entries are stored as `"<txid>_<vout>:<satoshis>"` tokens. Only four
//! operations exist: pop from the front, push to the front (returning
//! inputs of a failed attempt), push to the back (new change) and a full
//! replace (balance refresh). Each is atomic with respect to the others.

use crate::error::{Error, Result};
use opns_core::Outpoint;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A spendable output of the funding identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingEntry {
    pub outpoint: Outpoint,
    pub satoshis: u64,
}

impl FundingEntry {
    pub fn new(outpoint: Outpoint, satoshis: u64) -> Self {
        FundingEntry { outpoint, satoshis }
    }
}

impl fmt::Display for FundingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.outpoint, self.satoshis)
    }
}

impl FromStr for FundingEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (outpoint, satoshis) = s.rsplit_once(':').ok_or_else(|| Error::QueueEntry(s.into()))?;
        let satoshis = satoshis.parse::<u64>().map_err(|_| Error::QueueEntry(s.into()))?;
        Ok(FundingEntry::new(outpoint.parse()?, satoshis))
    }
}

/// Ordered store of funding entries.
pub trait FundingQueue: Send + Sync {
    /// Remove and return the front entry.
    fn pop_front(&self) -> Result<Option<FundingEntry>>;

    /// Put entries back at the front; `entries[0]` becomes the new front.
    fn push_front(&self, entries: &[FundingEntry]) -> Result<()>;

    /// Append entries to the back.
    fn push_back(&self, entries: &[FundingEntry]) -> Result<()>;

    /// Replace the whole queue.
    fn replace(&self, entries: &[FundingEntry]) -> Result<()>;

    /// Current contents, front first.
    fn snapshot(&self) -> Result<Vec<FundingEntry>>;

    /// Total value held in the queue.
    fn balance(&self) -> Result<u64> {
        Ok(self.snapshot()?.iter().map(|e| e.satoshis).sum())
    }
}

fn apply_push_front(queue: &mut VecDeque<FundingEntry>, entries: &[FundingEntry]) {
    for entry in entries.iter().rev() {
        queue.push_front(*entry);
    }
}

/// Process-local queue.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<VecDeque<FundingEntry>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[FundingEntry]) -> Self {
        MemoryQueue { entries: Mutex::new(entries.iter().copied().collect()) }
    }
}

impl FundingQueue for MemoryQueue {
    fn pop_front(&self) -> Result<Option<FundingEntry>> {
        Ok(self.entries.lock().pop_front())
    }

    fn push_front(&self, entries: &[FundingEntry]) -> Result<()> {
        apply_push_front(&mut self.entries.lock(), entries);
        Ok(())
    }

    fn push_back(&self, entries: &[FundingEntry]) -> Result<()> {
        self.entries.lock().extend(entries.iter().copied());
        Ok(())
    }

    fn replace(&self, entries: &[FundingEntry]) -> Result<()> {
        let mut queue = self.entries.lock();
        queue.clear();
        queue.extend(entries.iter().copied());
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<FundingEntry>> {
        Ok(self.entries.lock().iter().copied().collect())
    }
}

/// Queue persisted to a text file, one token per line.
///
/// Every mutation loads the file, applies the change and writes a sibling
/// temp file that is renamed over the original, all under one lock.
#[derive(Debug)]
pub struct FileQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileQueue {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let queue = FileQueue { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) };
        // Surface a corrupt queue at startup rather than mid-mining.
        queue.load()?;
        Ok(queue)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<VecDeque<FundingEntry>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(VecDeque::new()),
            Err(err) => return Err(err.into()),
        };

        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(FundingEntry::from_str)
            .collect()
    }

    fn store(&self, entries: &VecDeque<FundingEntry>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            for entry in entries {
                writeln!(file, "{}", entry)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut VecDeque<FundingEntry>) -> T) -> Result<T> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        let result = f(&mut entries);
        self.store(&entries)?;
        Ok(result)
    }
}

impl FundingQueue for FileQueue {
    fn pop_front(&self) -> Result<Option<FundingEntry>> {
        self.update(|entries| entries.pop_front())
    }

    fn push_front(&self, entries: &[FundingEntry]) -> Result<()> {
        self.update(|queue| apply_push_front(queue, entries))
    }

    fn push_back(&self, entries: &[FundingEntry]) -> Result<()> {
        self.update(|queue| queue.extend(entries.iter().copied()))
    }

    fn replace(&self, entries: &[FundingEntry]) -> Result<()> {
        self.update(|queue| {
            queue.clear();
            queue.extend(entries.iter().copied());
        })
    }

    fn snapshot(&self) -> Result<Vec<FundingEntry>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.into_iter().collect())
    }
}
