// src/policy.rs
//
// Baseline drivers for rollouts and parity suites.
//
// - Policy: maps an observation to a raw action code
// - RandomPolicy: uniform codes from a half-open range (ChaCha8, seeded)
// - CyclePolicy: replays a fixed pattern, tiled
//
// Codes are raw `i64` so suites can exercise out-of-range inputs; the env
// treats anything outside 0..=68 as an invalid action.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::N_ACTIONS;
use crate::observation::Observation;

pub const RANDOM_POLICY_VERSION: &str = "random-v1";
pub const CYCLE_POLICY_VERSION: &str = "cycle-v1";

pub trait Policy: Send {
    fn version(&self) -> &str;

    /// Next action code for the given observation.
    fn act(&mut self, obs: &Observation) -> i64;

    /// Called at the start of each episode.
    fn reset_episode(&mut self, seed: u64, episode_id: u64);
}

/// Uniform random codes in `[low, high)`.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: ChaCha8Rng,
    low: i64,
    high: i64,
    reseed_per_episode: bool,
}

impl RandomPolicy {
    /// Valid codes only.
    pub fn new(seed: u64) -> Self {
        Self::with_range(seed, 0, N_ACTIONS as i64)
    }

    /// Codes in `[low, high)`; a single stream shared across episodes.
    ///
    /// An empty range collapses to `low`.
    pub fn with_range(seed: u64, low: i64, high: i64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            low,
            high: high.max(low.saturating_add(1)),
            reseed_per_episode: false,
        }
    }

    pub fn reseeding(mut self) -> Self {
        self.reseed_per_episode = true;
        self
    }

    pub fn next_code(&mut self) -> i64 {
        if self.high <= self.low {
            return self.low;
        }
        self.rng.gen_range(self.low..self.high)
    }
}

impl Policy for RandomPolicy {
    fn version(&self) -> &str {
        RANDOM_POLICY_VERSION
    }

    fn act(&mut self, _obs: &Observation) -> i64 {
        self.next_code()
    }

    fn reset_episode(&mut self, seed: u64, _episode_id: u64) {
        if self.reseed_per_episode {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
    }
}

/// Replays `pattern` from the start of every episode.
#[derive(Debug, Clone)]
pub struct CyclePolicy {
    pattern: Vec<i64>,
    cursor: usize,
    restart_per_episode: bool,
}

impl CyclePolicy {
    /// An empty pattern replays Hold.
    pub fn new(pattern: Vec<i64>) -> Self {
        let pattern = if pattern.is_empty() { vec![6] } else { pattern };
        Self {
            pattern,
            cursor: 0,
            restart_per_episode: true,
        }
    }

    /// Keep the cursor running across episode boundaries.
    pub fn continuous(mut self) -> Self {
        self.restart_per_episode = false;
        self
    }

    pub fn next_code(&mut self) -> i64 {
        let code = self.pattern[self.cursor % self.pattern.len()];
        self.cursor += 1;
        code
    }
}

impl Policy for CyclePolicy {
    fn version(&self) -> &str {
        CYCLE_POLICY_VERSION
    }

    fn act(&mut self, _obs: &Observation) -> i64 {
        self.next_code()
    }

    fn reset_episode(&mut self, _seed: u64, _episode_id: u64) {
        if self.restart_per_episode {
            self.cursor = 0;
        }
    }
}
