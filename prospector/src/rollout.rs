// src/rollout.rs
//
// Multi-seed rollouts.
//
// Each seed runs one episode on its own `ProspectorEnv`; instances share
// nothing, so seeds are split across scoped worker threads and the results
// are put back in seed order. Output is identical for any thread count.

use std::thread;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::env::{EnvError, ProspectorEnv, TerminationReason};
use crate::logging::{EventSink, NoopSink};
use crate::policy::{CyclePolicy, Policy, RandomPolicy};

/// Which baseline driver to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Uniform valid codes, reseeded from the episode seed.
    Random,
    Cycle(Vec<i64>),
}

impl PolicyKind {
    pub fn build(&self, seed: u64) -> Box<dyn Policy> {
        match self {
            PolicyKind::Random => Box::new(RandomPolicy::new(seed).reseeding()),
            PolicyKind::Cycle(pattern) => Box::new(CyclePolicy::new(pattern.clone())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
    pub engine: EngineConfig,
    pub seed_start: u64,
    pub num_seeds: u64,
    /// Step cap per episode; the episode may end earlier.
    pub max_steps: u64,
    pub threads: usize,
    pub policy: PolicyKind,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            seed_start: 0,
            num_seeds: 10,
            max_steps: 2000,
            threads: 1,
            policy: PolicyKind::Random,
        }
    }
}

/// Summary of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode_id: u64,
    pub seed: u64,
    pub policy: String,
    /// Calls to `step`.
    pub steps: u64,
    /// Simulation ticks (sum of dt).
    pub ticks: u64,
    pub total_return: f64,
    pub credits: f32,
    pub net_profit: f32,
    pub survival: f32,
    pub invalid_actions: u64,
    pub pirate_encounters: f32,
    pub terminated: bool,
    pub truncated: bool,
    /// `None` when the step cap was hit first.
    pub termination_reason: Option<TerminationReason>,
}

/// Run a single episode from `reset(seed)` until done or `max_steps`.
pub fn run_episode(
    config: EngineConfig,
    seed: u64,
    episode_id: u64,
    max_steps: u64,
    policy: &mut dyn Policy,
    sink: &mut dyn EventSink,
) -> Result<EpisodeSummary, EnvError> {
    let mut env = ProspectorEnv::new(config, seed);
    let (mut obs, mut info) = env.reset(Some(seed));
    policy.reset_episode(seed, episode_id);

    let mut summary = EpisodeSummary {
        episode_id,
        seed,
        policy: policy.version().to_string(),
        steps: 0,
        ticks: 0,
        total_return: 0.0,
        credits: info.credits,
        net_profit: info.net_profit,
        survival: info.survival,
        invalid_actions: 0,
        pirate_encounters: 0.0,
        terminated: false,
        truncated: false,
        termination_reason: None,
    };

    while summary.steps < max_steps {
        let action = policy.act(&obs);
        let result = env.step_raw(action)?;
        sink.log_step(seed, summary.steps, action, &result);

        summary.steps += 1;
        summary.ticks += result.info.dt as u64;
        summary.total_return += result.reward as f64;
        if result.info.invalid_action {
            summary.invalid_actions += 1;
        }
        summary.terminated = result.terminated;
        summary.truncated = result.truncated;

        let done = result.done();
        obs = result.observation;
        info = result.info;
        if done {
            break;
        }
    }

    summary.credits = info.credits;
    summary.net_profit = info.net_profit;
    summary.survival = info.survival;
    summary.pirate_encounters = info.pirate_encounters;
    summary.termination_reason = info.termination_reason;
    sink.log_episode(&summary);
    Ok(summary)
}

/// Run every seed in `cfg` and return summaries in seed order.
///
/// With one thread, steps and episodes go to `sink` as they happen. With more,
/// workers run silently and only episode summaries reach `sink`, in seed order.
pub fn run_rollouts(
    cfg: &RolloutConfig,
    sink: &mut dyn EventSink,
) -> Result<Vec<EpisodeSummary>, EnvError> {
    let seeds: Vec<(u64, u64)> = (0..cfg.num_seeds)
        .map(|i| (i, cfg.seed_start.wrapping_add(i)))
        .collect();

    if cfg.threads <= 1 || seeds.len() <= 1 {
        return seeds
            .iter()
            .map(|&(episode_id, seed)| {
                let mut policy = cfg.policy.build(seed);
                run_episode(cfg.engine, seed, episode_id, cfg.max_steps, policy.as_mut(), sink)
            })
            .collect();
    }

    let chunk_size = seeds.len().div_ceil(cfg.threads);
    let chunks: Vec<Result<Vec<EpisodeSummary>, EnvError>> = thread::scope(|scope| {
        let handles: Vec<_> = seeds
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    let mut noop = NoopSink;
                    chunk
                        .iter()
                        .map(|&(episode_id, seed)| {
                            let mut policy = cfg.policy.build(seed);
                            run_episode(
                                cfg.engine,
                                seed,
                                episode_id,
                                cfg.max_steps,
                                policy.as_mut(),
                                &mut noop,
                            )
                        })
                        .collect()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
            .collect()
    });

    let mut summaries = Vec::with_capacity(seeds.len());
    for chunk in chunks {
        summaries.extend(chunk?);
    }
    for summary in &summaries {
        sink.log_episode(summary);
    }
    Ok(summaries)
}

/// Streaming mean / population std / min / max (Welford).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub count: u64,
    pub mean: f64,
    m2: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn std_pop(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::default();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

/// Aggregate over a set of episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutAggregate {
    pub episodes: u64,
    pub survival_rate: f64,
    pub total_return: RunningStats,
    pub net_profit: RunningStats,
    pub steps: RunningStats,
    pub ticks: RunningStats,
    pub invalid_actions: u64,
}

impl RolloutAggregate {
    pub fn from_summaries(summaries: &[EpisodeSummary]) -> Self {
        let episodes = summaries.len() as u64;
        let survived = summaries.iter().filter(|s| s.survival > 0.5).count();
        Self {
            episodes,
            survival_rate: if episodes == 0 {
                0.0
            } else {
                survived as f64 / episodes as f64
            },
            total_return: summaries.iter().map(|s| s.total_return).collect(),
            net_profit: summaries.iter().map(|s| s.net_profit as f64).collect(),
            steps: summaries.iter().map(|s| s.steps as f64).collect(),
            ticks: summaries.iter().map(|s| s.ticks as f64).collect(),
            invalid_actions: summaries.iter().map(|s| s.invalid_actions).sum(),
        }
    }
}
