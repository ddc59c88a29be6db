//! Parallel proof-of-work search.
//!
//! Each worker hashes `prior || character || nonce` with fresh random
//! nonces until one meets the difficulty or another worker has already
//! won. Winning is decided by a single compare-exchange on a shared flag,
//! so exactly one result is delivered per search and late winners are
//! dropped.

use opns_core::difficulty::{format_hash_rate, pow_preimage};
use opns_core::{double_sha256, meets_difficulty, DIFFICULTY, NONCE_SIZE};
use rand::RngCore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// A nonce that satisfies the difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowResult {
    pub nonce: [u8; NONCE_SIZE],
    pub hash: [u8; 32],
    /// Hashes computed across all workers.
    pub attempts: u64,
    pub elapsed: Duration,
}

impl PowResult {
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PowEngine {
    difficulty: u32,
    workers: usize,
}

impl Default for PowEngine {
    fn default() -> Self {
        PowEngine::new(num_cpus::get())
    }
}

impl PowEngine {
    /// Engine at protocol difficulty with `workers` threads.
    pub fn new(workers: usize) -> Self {
        PowEngine { difficulty: DIFFICULTY, workers: workers.max(1) }
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Search for a nonce over `prior || character`. Blocks until found.
    pub fn mine(&self, prior: &[u8], character: u8) -> PowResult {
        loop {
            if let Some(result) = self.search(prior, character) {
                info!(
                    character = %char::from(character),
                    hashes = result.attempts,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    rate = %format_hash_rate(result.hash_rate()),
                    "Found proof-of-work"
                );
                return result;
            }
            warn!("All proof-of-work workers exited without a result, restarting search");
        }
    }

    fn search(&self, prior: &[u8], character: u8) -> Option<PowResult> {
        let found = AtomicBool::new(false);
        let attempts = AtomicU64::new(0);
        let started = Instant::now();

        debug!(
            workers = self.workers,
            difficulty = self.difficulty,
            "Starting proof-of-work search"
        );

        let winner = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers)
                .map(|worker_id| {
                    let found = &found;
                    let attempts = &attempts;
                    scope.spawn(move || self.worker(worker_id, prior, character, found, attempts))
                })
                .collect();

            let mut winner = None;
            for handle in handles {
                if let Ok(Some(result)) = handle.join() {
                    winner.get_or_insert(result);
                }
            }
            winner
        });

        winner.map(|(nonce, hash)| PowResult {
            nonce,
            hash,
            attempts: attempts.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        })
    }

    fn worker(
        &self,
        worker_id: usize,
        prior: &[u8],
        character: u8,
        found: &AtomicBool,
        attempts: &AtomicU64,
    ) -> Option<([u8; NONCE_SIZE], [u8; 32])> {
        let mut rng = rand::thread_rng();
        let mut preimage = pow_preimage(prior, character, &[0u8; NONCE_SIZE]);
        let nonce_at = preimage.len() - NONCE_SIZE;
        let mut local = 0u64;
        let mut result = None;

        while !found.load(Ordering::Relaxed) {
            rng.fill_bytes(&mut preimage[nonce_at..]);
            let hash = double_sha256(&preimage);
            local += 1;

            if !meets_difficulty(&hash, self.difficulty) {
                continue;
            }

            if found
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let mut nonce = [0u8; NONCE_SIZE];
                nonce.copy_from_slice(&preimage[nonce_at..]);
                result = Some((nonce, hash));
            } else {
                trace!(worker_id, "Dropping late proof-of-work result");
            }
            break;
        }

        attempts.fetch_add(local, Ordering::Relaxed);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opns_core::verify_pow;

    #[test]
    fn test_mined_nonce_verifies() {
        let engine = PowEngine::new(4).with_difficulty(8);
        let prior = [0x5au8; 32];
        let result = engine.mine(&prior, b'x');

        assert_eq!(verify_pow(&prior, b'x', &result.nonce, 8), Some(result.hash));
        assert!(result.attempts >= 1);
    }

    #[test]
    fn test_result_depends_on_character() {
        let engine = PowEngine::new(2).with_difficulty(6);
        let prior = [0u8; 32];
        let result = engine.mine(&prior, b'a');

        assert!(verify_pow(&prior, b'a', &result.nonce, 6).is_some());
        // A digest that meets 32 zero bits by accident is astronomically unlikely.
        assert!(verify_pow(&prior, b'b', &result.nonce, 32).is_none());
    }

    #[test]
    fn test_simultaneous_winners_yield_one_valid_result() {
        // Every hash wins at difficulty zero, so all workers race to claim.
        let engine = PowEngine::new(64).with_difficulty(0);
        let prior = [0x33u8; 32];

        for _ in 0..50 {
            let result = engine.mine(&prior, b'q');
            assert_eq!(verify_pow(&prior, b'q', &result.nonce, 0), Some(result.hash));
            assert!(result.attempts >= 1);
        }
    }

    #[test]
    fn test_single_worker() {
        let engine = PowEngine::new(0).with_difficulty(4);
        assert_eq!(engine.workers(), 1);

        let result = engine.mine(b"", b'z');
        assert!(meets_difficulty(&result.hash, 4));
    }

    #[test]
    fn test_default_difficulty() {
        assert_eq!(PowEngine::new(1).difficulty(), DIFFICULTY);
    }
}
