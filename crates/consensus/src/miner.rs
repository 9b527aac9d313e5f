//! Multi-threaded proof-of-work mining.
//!
//! Each worker scans its own stride of the nonce space: with `n` workers,
//! worker `i` tries `i, i + n, i + 2n, ...`. A worker that finds a solution
//! publishes its nonce as the best known answer; every worker stops once its
//! next candidate is above that answer. The result is therefore the lowest
//! satisfying nonce, the same one a sequential search finds.

use powledger_core::pow::{self, NonceRange, Solution};
use powledger_core::{Block, Hash};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Mining configuration.
#[derive(Debug, Clone)]
pub struct MiningConfig {
    /// Number of worker threads (at least 1).
    pub threads: usize,
    /// Give up after this long. `None` mines until a solution is found.
    pub timeout: Option<Duration>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            timeout: None,
        }
    }
}

impl MiningConfig {
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of a mining run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningOutcome {
    Mined { hash: Hash, nonce: u64, attempts: u64 },
    /// Stopped by the caller or by the timeout before a solution was found.
    Cancelled { attempts: u64 },
}

impl MiningOutcome {
    pub fn hash(&self) -> Option<Hash> {
        match self {
            Self::Mined { hash, .. } => Some(*hash),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn is_mined(&self) -> bool {
        matches!(self, Self::Mined { .. })
    }
}

/// Parallel block miner.
pub struct Miner {
    config: MiningConfig,
}

impl Miner {
    pub fn new(config: MiningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Mine `block` until a solution is found or the timeout elapses.
    pub fn mine(&self, block: &mut Block) -> MiningOutcome {
        let cancel = AtomicBool::new(false);
        self.mine_with_cancel(block, &cancel)
    }

    /// Mine `block`, stopping early when `cancel` is set.
    ///
    /// The block is borrowed for the whole run, so its records cannot change
    /// while workers hash it. On success the block is sealed with the winning
    /// nonce; on cancellation it is left unmined.
    pub fn mine_with_cancel(&self, block: &mut Block, cancel: &AtomicBool) -> MiningOutcome {
        if let Some(hash) = block.block_hash() {
            return MiningOutcome::Mined {
                hash,
                nonce: block.nonce(),
                attempts: 0,
            };
        }

        let workers = self.config.threads.max(1) as u64;
        let template = block.hash_template();
        let difficulty = block.difficulty();
        let deadline = self.config.timeout.map(|t| Instant::now() + t);

        let best_nonce = AtomicU64::new(u64::MAX);
        let winner: Mutex<Option<Solution>> = Mutex::new(None);
        let attempts = AtomicU64::new(0);
        let stop = AtomicBool::new(false);

        debug!(workers, difficulty, "starting parallel mining");

        thread::scope(|scope| {
            for worker in 0..workers {
                let template = &template;
                let best_nonce = &best_nonce;
                let winner = &winner;
                let attempts = &attempts;
                let stop = &stop;

                scope.spawn(move || {
                    let range = NonceRange {
                        start: worker,
                        step: workers,
                    };
                    let should_stop = |nonce: u64| {
                        stop.load(Ordering::Relaxed)
                            || cancel.load(Ordering::Relaxed)
                            || nonce > best_nonce.load(Ordering::Acquire)
                    };
                    let result = pow::search(template, difficulty, range, should_stop);
                    match result {
                        Ok(solution) => {
                            attempts.fetch_add(solution.attempts, Ordering::Relaxed);
                            let previous = best_nonce.fetch_min(solution.nonce, Ordering::AcqRel);
                            if solution.nonce < previous {
                                if let Ok(mut slot) = winner.lock() {
                                    match *slot {
                                        Some(current) if current.nonce < solution.nonce => {}
                                        _ => *slot = Some(solution),
                                    }
                                }
                            }
                        }
                        Err(tried) => {
                            attempts.fetch_add(tried, Ordering::Relaxed);
                        }
                    }
                });
            }

            if let Some(deadline) = deadline {
                watch_deadline(deadline, &stop, &best_nonce, cancel);
            }
        });

        let attempts = attempts.load(Ordering::Relaxed);
        let solution = winner.into_inner().ok().flatten();

        match solution {
            Some(solution) => {
                let solution = Solution {
                    attempts,
                    ..solution
                };
                match block.apply_solution(solution) {
                    Some(hash) => {
                        info!(nonce = solution.nonce, attempts, "parallel mining succeeded");
                        MiningOutcome::Mined {
                            hash,
                            nonce: solution.nonce,
                            attempts,
                        }
                    }
                    None => {
                        warn!(nonce = solution.nonce, "worker solution did not reproduce");
                        MiningOutcome::Cancelled { attempts }
                    }
                }
            }
            None => {
                if stop.load(Ordering::Relaxed) {
                    warn!(attempts, "mining timed out");
                } else {
                    debug!(attempts, "mining cancelled");
                }
                MiningOutcome::Cancelled { attempts }
            }
        }
    }
}

/// Block the calling thread until the deadline passes or the search ends,
/// then raise `stop`.
fn watch_deadline(deadline: Instant, stop: &AtomicBool, best_nonce: &AtomicU64, cancel: &AtomicBool) {
    const POLL: Duration = Duration::from_millis(5);
    loop {
        if best_nonce.load(Ordering::Acquire) != u64::MAX || cancel.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            stop.store(true, Ordering::Relaxed);
            return;
        }
        thread::sleep(POLL.min(deadline - now));
    }
}
