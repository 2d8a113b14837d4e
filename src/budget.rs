//! Sliding-window request and token budgeting
//!
//! A [`BudgetTracker`] keeps a rolling account of every admitted call over
//! the trailing 60 seconds and delays callers just long enough that the
//! window never exceeds the configured requests-per-minute and
//! tokens-per-minute limits. One tracker is shared by every caller of the
//! same API key; the window is the only shared mutable state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Length of the accounting window.
const WINDOW: Duration = Duration::from_secs(60);

/// Computed waits are padded by this factor so the re-check after sleeping
/// normally admits on the first pass.
const WAIT_PAD: f32 = 1.1;

/// Approximate number of input characters per token.
pub const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of a piece of text.
///
/// Character count divided by four. A heuristic, not an exact count: callers
/// that need precision should over-provision a safety margin.
pub fn estimate_tokens(text: &str) -> u64 {
    estimate_tokens_for_len(text.len())
}

/// Estimate the token cost of `len` characters of input.
pub fn estimate_tokens_for_len(len: usize) -> u64 {
    (len / APPROX_CHARS_PER_TOKEN).max(1) as u64
}

/// Per-minute request and token limits enforced by a [`BudgetTracker`].
#[derive(Debug, Clone, Copy)]
pub struct CallBudget {
    /// Maximum requests admitted in any trailing 60-second window
    pub requests_per_minute: u32,
    /// Maximum estimated tokens admitted in any trailing 60-second window
    pub tokens_per_minute: u64,
}

impl CallBudget {
    /// Budget tuned for Gemini free-tier limits, set slightly below the
    /// published numbers to absorb clock skew and shared API keys.
    pub fn gemini_free_tier() -> Self {
        Self {
            requests_per_minute: 28,
            tokens_per_minute: 950_000,
        }
    }
}

/// One accounted call.
#[derive(Debug, Clone, Copy)]
struct Charge {
    at: Instant,
    tokens: u64,
}

/// Rolling request/token accounting shared by every caller of one API key.
///
/// [`reserve`](Self::reserve) suspends the caller until admitting the call
/// keeps the trailing window within budget. It never fails, it only delays.
#[derive(Debug)]
pub struct BudgetTracker {
    budget: CallBudget,
    window: Mutex<VecDeque<Charge>>,
}

impl BudgetTracker {
    pub fn new(budget: CallBudget) -> Self {
        Self {
            budget,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// The configured limits.
    pub fn budget(&self) -> CallBudget {
        self.budget
    }

    /// Current request count and token sum in the trailing window.
    pub async fn usage(&self) -> (usize, u64) {
        let mut window = self.window.lock().await;
        prune(&mut window, Instant::now());
        (window.len(), window.iter().map(|charge| charge.tokens).sum())
    }

    /// Admit one call costing `estimated_tokens`, sleeping as long as needed
    /// to stay within budget. Returns the total time spent waiting.
    ///
    /// The window lock is held only across the prune-decide-record step.
    /// Sleeping happens with the lock released, and the decision is
    /// re-checked afterward since other callers may have been admitted in
    /// the meantime.
    pub async fn reserve(&self, estimated_tokens: u64) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                prune(&mut window, now);
                match self.required_wait(&window, estimated_tokens, now) {
                    None => {
                        window.push_back(Charge {
                            at: now,
                            tokens: estimated_tokens,
                        });
                        if !waited.is_zero() {
                            debug!(
                                waited_ms = waited.as_millis() as u64,
                                estimated_tokens, "admitted after waiting"
                            );
                        }
                        return waited;
                    }
                    Some(wait) => wait,
                }
            };

            let wait = wait.mul_f32(WAIT_PAD).max(Duration::from_millis(1));
            debug!(
                wait_ms = wait.as_millis() as u64,
                estimated_tokens, "budget window full, waiting"
            );
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    /// How long the caller must wait before this charge fits, or `None` if
    /// it fits now. `window` must already be pruned to `now`.
    fn required_wait(
        &self,
        window: &VecDeque<Charge>,
        estimated_tokens: u64,
        now: Instant,
    ) -> Option<Duration> {
        let mut wait: Option<Duration> = None;

        if window.len() + 1 > self.budget.requests_per_minute as usize {
            // a request slot frees up when the oldest charge expires
            if let Some(oldest) = window.front() {
                wait = Some(time_until_expiry(oldest, now));
            }
        }

        let used: u64 = window.iter().map(|charge| charge.tokens).sum();
        if used + estimated_tokens > self.budget.tokens_per_minute {
            if window.is_empty() {
                // a single call costing more than the whole budget would
                // otherwise wait forever
                warn!(
                    estimated_tokens,
                    tokens_per_minute = self.budget.tokens_per_minute,
                    "estimated cost exceeds the full token budget, admitting anyway"
                );
            } else {
                // walk from the oldest charge until enough tokens expire
                let mut remaining = used;
                let mut token_wait = Duration::ZERO;
                for charge in window.iter() {
                    remaining -= charge.tokens;
                    token_wait = time_until_expiry(charge, now);
                    if remaining + estimated_tokens <= self.budget.tokens_per_minute {
                        break;
                    }
                }
                wait = Some(match wait {
                    Some(request_wait) => request_wait.max(token_wait),
                    None => token_wait,
                });
            }
        }

        wait
    }
}

fn prune(window: &mut VecDeque<Charge>, now: Instant) {
    while let Some(charge) = window.front() {
        if now.duration_since(charge.at) > WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}

fn time_until_expiry(charge: &Charge, now: Instant) -> Duration {
    WINDOW
        .checked_sub(now.duration_since(charge.at))
        .unwrap_or_else(|| Duration::from_millis(1))
}
