// src/parity.rs
//
// Cross-build parity harness.
//
// A case is (suite, seed, time_max, steps). The action sequence comes from the
// suite and `seed + ACTION_SEED_OFFSET`; the env starts at `reset(seed)` and
// every time an episode ends it restarts with the next episode seed
// (seed + 1, seed + 2, ...). Each step records dt, flags, reward, the full
// observation and the numeric info fields.
//
// Traces are written as JSONL (one header line, then one line per step) so
// two builds can be recorded separately and compared offline. Comparison
// order per step: terminated, truncated, dt, reward, obs, info. The first
// failing field is reported.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::env::{EnvError, ProspectorEnv, StepResult, NUMERIC_INFO_KEYS};
use crate::policy::{CyclePolicy, RandomPolicy};
use crate::vec_env::VecEnv;

/// Action streams are drawn from `seed + ACTION_SEED_OFFSET`.
pub const ACTION_SEED_OFFSET: u64 = 1000;

/// Suite A draws uniformly from `[SUITE_A_LOW, SUITE_A_HIGH)`.
pub const SUITE_A_LOW: i64 = -5;
pub const SUITE_A_HIGH: i64 = 75;

/// Illegal and boundary codes: station-only actions away from station,
/// out-of-range codes, end-run.
pub const SUITE_B_PATTERN: [i64; 16] = [43, 61, 67, 28, 29, 30, 10, 9, 7, 33, 200, -3, 255, 6, 42, 68];

/// A plausible mining loop: scan, select, mine, travel, dock, sell.
pub const SUITE_C_PATTERN: [i64; 14] = [8, 11, 12, 29, 33, 6, 0, 42, 45, 32, 35, 7, 6, 68];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suite {
    A,
    B,
    C,
}

impl Suite {
    pub const ALL: [Suite; 3] = [Suite::A, Suite::B, Suite::C];

    /// `steps` raw action codes for this suite.
    pub fn actions(self, steps: usize, action_seed: u64) -> Vec<i64> {
        match self {
            Suite::A => {
                let mut policy = RandomPolicy::with_range(action_seed, SUITE_A_LOW, SUITE_A_HIGH);
                (0..steps).map(|_| policy.next_code()).collect()
            }
            Suite::B => tiled(&SUITE_B_PATTERN, steps),
            Suite::C => tiled(&SUITE_C_PATTERN, steps),
        }
    }
}

fn tiled(pattern: &[i64], steps: usize) -> Vec<i64> {
    let mut policy = CyclePolicy::new(pattern.to_vec()).continuous();
    (0..steps).map(|_| policy.next_code()).collect()
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Suite::A => "A",
            Suite::B => "B",
            Suite::C => "C",
        };
        f.write_str(s)
    }
}

impl FromStr for Suite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Suite::A),
            "B" => Ok(Suite::B),
            "C" => Ok(Suite::C),
            other => Err(format!("unknown suite '{}' (expected A, B or C)", other)),
        }
    }
}

/// Errors from recording, reading or comparing traces.
#[derive(Debug)]
pub enum TraceError {
    Io(io::Error),
    Parse { line: usize, source: serde_json::Error },
    Env(EnvError),
    MissingHeader,
    LengthMismatch { reference: usize, candidate: usize },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Io(err) => write!(f, "trace I/O error: {}", err),
            TraceError::Parse { line, source } => {
                write!(f, "failed to parse trace line {}: {}", line, source)
            }
            TraceError::Env(err) => write!(f, "environment error while recording: {}", err),
            TraceError::MissingHeader => write!(f, "trace has no header line"),
            TraceError::LengthMismatch {
                reference,
                candidate,
            } => write!(
                f,
                "trace length mismatch: reference has {} steps, candidate has {}",
                reference, candidate
            ),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TraceError::Io(err) => Some(err),
            TraceError::Parse { source, .. } => Some(source),
            TraceError::Env(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        TraceError::Io(err)
    }
}

impl From<EnvError> for TraceError {
    fn from(err: EnvError) -> Self {
        TraceError::Env(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHeader {
    pub suite: Suite,
    pub seed: u64,
    pub time_max: f32,
    pub invalid_action_penalty: f32,
    pub steps: usize,
    /// Free-form label for the build that produced the trace.
    pub build: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub action: i64,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub dt: u16,
    pub obs: Vec<f32>,
    /// Values for `NUMERIC_INFO_KEYS`, same order.
    pub info: Vec<f32>,
}

impl TraceStep {
    fn from_result(action: i64, result: &StepResult) -> Self {
        Self {
            action,
            reward: result.reward,
            terminated: result.terminated,
            truncated: result.truncated,
            dt: result.info.dt,
            obs: result.observation.values.clone(),
            info: result.info.numeric_values().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TraceLine {
    Header(TraceHeader),
    Step(TraceStep),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub header: TraceHeader,
    pub steps: Vec<TraceStep>,
}

pub fn build_label() -> String {
    format!("prospector-{}", env!("CARGO_PKG_VERSION"))
}

impl Trace {
    /// Record one case on a single env.
    pub fn record(
        config: EngineConfig,
        suite: Suite,
        seed: u64,
        steps: usize,
    ) -> Result<Self, TraceError> {
        let config = config.sanitized();
        let actions = suite.actions(steps, seed.wrapping_add(ACTION_SEED_OFFSET));
        let mut env = ProspectorEnv::new(config, seed);
        env.reset(Some(seed));

        let mut episode_seed = seed;
        let mut records = Vec::with_capacity(steps);
        for &action in &actions {
            let result = env.step_raw(action)?;
            records.push(TraceStep::from_result(action, &result));
            if result.done() {
                episode_seed = episode_seed.wrapping_add(1);
                env.reset(Some(episode_seed));
            }
        }

        Ok(Self {
            header: header(config, suite, seed, steps),
            steps: records,
        })
    }

    /// Record several seeds of one suite through a single `VecEnv`.
    ///
    /// Must produce exactly the traces `record` produces seed by seed.
    pub fn record_batched(
        config: EngineConfig,
        suite: Suite,
        seeds: &[u64],
        steps: usize,
    ) -> Result<Vec<Self>, TraceError> {
        let config = config.sanitized();
        let actions: Vec<Vec<i64>> = seeds
            .iter()
            .map(|&s| suite.actions(steps, s.wrapping_add(ACTION_SEED_OFFSET)))
            .collect();

        let mut vec_env = VecEnv::new(seeds.len(), config, 0);
        vec_env.reset_all(Some(seeds));
        let mut episode_seeds = seeds.to_vec();
        let mut records: Vec<Vec<TraceStep>> =
            seeds.iter().map(|_| Vec::with_capacity(steps)).collect();

        for t in 0..steps {
            let batch_actions: Vec<i64> = actions.iter().map(|a| a[t]).collect();
            let batch = vec_env.step_raw(&batch_actions)?;
            for (i, record) in records.iter_mut().enumerate() {
                record.push(TraceStep {
                    action: batch_actions[i],
                    reward: batch.rewards[i],
                    terminated: batch.terminated[i],
                    truncated: batch.truncated[i],
                    dt: batch.infos[i].dt,
                    obs: batch.observation(i).to_vec(),
                    info: batch.infos[i].numeric_values().to_vec(),
                });
                if batch.done(i) {
                    episode_seeds[i] = episode_seeds[i].wrapping_add(1);
                    vec_env.reset_one(i, Some(episode_seeds[i]));
                }
            }
        }

        Ok(seeds
            .iter()
            .zip(records)
            .map(|(&seed, steps_rec)| Self {
                header: header(config, suite, seed, steps),
                steps: steps_rec,
            })
            .collect())
    }

    pub fn write_jsonl(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        write_line(&mut writer, &TraceLine::Header(self.header.clone()))?;
        for step in &self.steps {
            write_line(&mut writer, &TraceLine::Step(step.clone()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut header = None;
        let mut steps = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: TraceLine = serde_json::from_str(&line).map_err(|source| {
                TraceError::Parse {
                    line: idx + 1,
                    source,
                }
            })?;
            match parsed {
                TraceLine::Header(h) => header = Some(h),
                TraceLine::Step(s) => steps.push(s),
            }
        }
        let header = header.ok_or(TraceError::MissingHeader)?;
        Ok(Self { header, steps })
    }

    /// `sha256:<hex>` over the case parameters and every recorded value, bit-exact.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.header.suite.to_string().as_bytes());
        hasher.update(self.header.seed.to_le_bytes());
        hasher.update(self.header.time_max.to_bits().to_le_bytes());
        hasher.update(self.header.invalid_action_penalty.to_bits().to_le_bytes());
        for step in &self.steps {
            hasher.update(step.action.to_le_bytes());
            hasher.update(step.reward.to_bits().to_le_bytes());
            hasher.update([step.terminated as u8, step.truncated as u8]);
            hasher.update(step.dt.to_le_bytes());
            for v in step.obs.iter().chain(step.info.iter()) {
                hasher.update(v.to_bits().to_le_bytes());
            }
        }
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

fn header(config: EngineConfig, suite: Suite, seed: u64, steps: usize) -> TraceHeader {
    TraceHeader {
        suite,
        seed,
        time_max: config.time_max,
        invalid_action_penalty: config.invalid_action_penalty,
        steps,
        build: build_label(),
    }
}

fn write_line<W: Write>(writer: &mut W, line: &TraceLine) -> Result<(), TraceError> {
    serde_json::to_writer(&mut *writer, line).map_err(io::Error::from)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub obs_atol: f64,
    pub obs_rtol: f64,
    pub reward_atol: f64,
    pub reward_rtol: f64,
    /// Info fields pass when |a - b| <= info_rel * max(1, |a|, |b|).
    pub info_rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            obs_atol: 1e-6,
            obs_rtol: 1e-5,
            reward_atol: 1e-6,
            reward_rtol: 1e-5,
            info_rel: 1e-4,
        }
    }
}

/// First disagreement between two traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub step: usize,
    pub field: String,
    pub reference: f64,
    pub candidate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abs_diff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tol: Option<f64>,
}

impl Mismatch {
    fn exact(step: usize, field: &str, reference: f64, candidate: f64) -> Self {
        Self {
            step,
            field: field.to_string(),
            reference,
            candidate,
            abs_diff: None,
            obs_index: None,
            tol: None,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step={} field={} reference={} candidate={}",
            self.step, self.field, self.reference, self.candidate
        )?;
        if let Some(idx) = self.obs_index {
            write!(f, " obs_index={}", idx)?;
        }
        if let Some(diff) = self.abs_diff {
            write!(f, " abs_diff={:e}", diff)?;
        }
        Ok(())
    }
}

#[inline]
fn is_close(a: f64, b: f64, atol: f64, rtol: f64) -> bool {
    (a - b).abs() <= atol + rtol * a.abs().max(b.abs())
}

/// Compare two traces step by step; `Ok(None)` means they agree.
pub fn compare(
    reference: &Trace,
    candidate: &Trace,
    tol: &Tolerances,
) -> Result<Option<Mismatch>, TraceError> {
    if reference.steps.len() != candidate.steps.len() {
        return Err(TraceError::LengthMismatch {
            reference: reference.steps.len(),
            candidate: candidate.steps.len(),
        });
    }

    for (t, (r, c)) in reference.steps.iter().zip(&candidate.steps).enumerate() {
        if r.terminated != c.terminated {
            return Ok(Some(Mismatch::exact(
                t,
                "terminated",
                r.terminated as u8 as f64,
                c.terminated as u8 as f64,
            )));
        }
        if r.truncated != c.truncated {
            return Ok(Some(Mismatch::exact(
                t,
                "truncated",
                r.truncated as u8 as f64,
                c.truncated as u8 as f64,
            )));
        }
        if r.dt != c.dt {
            return Ok(Some(Mismatch::exact(t, "dt", r.dt as f64, c.dt as f64)));
        }

        let (rr, cr) = (r.reward as f64, c.reward as f64);
        if !is_close(rr, cr, tol.reward_atol, tol.reward_rtol) {
            return Ok(Some(Mismatch {
                abs_diff: Some((rr - cr).abs()),
                ..Mismatch::exact(t, "reward", rr, cr)
            }));
        }

        if r.obs.len() != c.obs.len() {
            return Ok(Some(Mismatch::exact(
                t,
                "obs.len",
                r.obs.len() as f64,
                c.obs.len() as f64,
            )));
        }
        for (idx, (&ro, &co)) in r.obs.iter().zip(&c.obs).enumerate() {
            let (ro, co) = (ro as f64, co as f64);
            if !is_close(ro, co, tol.obs_atol, tol.obs_rtol) {
                return Ok(Some(Mismatch {
                    abs_diff: Some((ro - co).abs()),
                    obs_index: Some(idx),
                    ..Mismatch::exact(t, "obs", ro, co)
                }));
            }
        }

        for (k, key) in NUMERIC_INFO_KEYS.iter().enumerate() {
            let rv = r.info.get(k).copied().unwrap_or(f32::NAN) as f64;
            let cv = c.info.get(k).copied().unwrap_or(f32::NAN) as f64;
            let info_tol = tol.info_rel * 1.0f64.max(rv.abs()).max(cv.abs());
            let diff = (rv - cv).abs();
            // NaN (missing field) never compares within tolerance.
            if !(diff <= info_tol) {
                return Ok(Some(Mismatch {
                    abs_diff: Some(diff),
                    tol: Some(info_tol),
                    ..Mismatch::exact(t, &format!("info.{}", key), rv, cv)
                }));
            }
        }
    }
    Ok(None)
}

/// Outcome of one in-process self-check case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfCheckCase {
    pub suite: Suite,
    pub seed: u64,
    pub digest: String,
    /// Two independent single-env runs matched bit for bit.
    pub deterministic: bool,
    /// The batched run matched the single-env run bit for bit.
    pub batched_equivalent: bool,
    pub episodes: usize,
}

impl SelfCheckCase {
    pub fn passed(&self) -> bool {
        self.deterministic && self.batched_equivalent
    }
}

/// Run each suite for every seed twice on a single env and once batched.
pub fn self_check(
    config: EngineConfig,
    suites: &[Suite],
    seeds: &[u64],
    steps: usize,
) -> Result<Vec<SelfCheckCase>, TraceError> {
    let mut cases = Vec::with_capacity(suites.len() * seeds.len());
    for &suite in suites {
        let batched = Trace::record_batched(config, suite, seeds, steps)?;
        for (&seed, batched_trace) in seeds.iter().zip(&batched) {
            let first = Trace::record(config, suite, seed, steps)?;
            let second = Trace::record(config, suite, seed, steps)?;
            let digest = first.digest();
            cases.push(SelfCheckCase {
                suite,
                seed,
                deterministic: digest == second.digest(),
                batched_equivalent: digest == batched_trace.digest(),
                episodes: 1 + first.steps.iter().filter(|s| s.terminated || s.truncated).count(),
                digest,
            });
        }
    }
    Ok(cases)
}
