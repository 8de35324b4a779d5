// src/vec_env.rs
//
// Batched environments for parallel rollouts.
//
// A `VecEnv` owns N independent `ProspectorEnv` instances. `step` walks them
// in index order and packs the results struct-of-arrays; per instance the
// outcome is identical to calling `ProspectorEnv::step` directly.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::constants::OBS_DIM;
use crate::env::{EnvError, ProspectorEnv, StepInfo};

/// Results of one batched step, laid out struct-of-arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStep {
    /// Row-major `[num_envs, OBS_DIM]`.
    pub observations: Vec<f32>,
    pub rewards: Vec<f32>,
    pub terminated: Vec<bool>,
    pub truncated: Vec<bool>,
    pub infos: Vec<StepInfo>,
}

impl BatchStep {
    fn with_capacity(n: usize) -> Self {
        Self {
            observations: vec![0.0; n * OBS_DIM],
            rewards: Vec::with_capacity(n),
            terminated: Vec::with_capacity(n),
            truncated: Vec::with_capacity(n),
            infos: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Observation row for instance `i`.
    pub fn observation(&self, i: usize) -> &[f32] {
        &self.observations[i * OBS_DIM..(i + 1) * OBS_DIM]
    }

    pub fn done(&self, i: usize) -> bool {
        self.terminated[i] || self.truncated[i]
    }
}

/// N independent environments stepped together.
#[derive(Debug, Clone)]
pub struct VecEnv {
    envs: Vec<ProspectorEnv>,
}

impl VecEnv {
    /// Instance `i` is constructed with seed `base_seed + i`.
    pub fn new(n: usize, config: EngineConfig, base_seed: u64) -> Self {
        let envs = (0..n)
            .map(|i| ProspectorEnv::new(config, base_seed.wrapping_add(i as u64)))
            .collect();
        Self { envs }
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    /// Reset every instance.
    ///
    /// Missing seeds (no slice, or a slice shorter than the batch) fall back to
    /// the instance's stored seed, so a reset without seeds replays the same
    /// worlds.
    pub fn reset_all(&mut self, seeds: Option<&[u64]>) -> Vec<f32> {
        let mut observations = vec![0.0; self.envs.len() * OBS_DIM];
        for (i, env) in self.envs.iter_mut().enumerate() {
            let seed = seeds
                .and_then(|s| s.get(i).copied())
                .unwrap_or_else(|| env.seed());
            env.reset(Some(seed));
            env.observe_into(&mut observations[i * OBS_DIM..(i + 1) * OBS_DIM]);
        }
        observations
    }

    /// Reset a single instance. Returns `None` if `index` is out of range.
    pub fn reset_one(&mut self, index: usize, seed: Option<u64>) -> Option<(Vec<f32>, StepInfo)> {
        let env = self.envs.get_mut(index)?;
        let (obs, info) = env.reset(seed);
        Some((obs.values, info))
    }

    /// Step every instance with its own action code.
    ///
    /// The batch is all-or-nothing: a wrong-length action slice, or any
    /// instance that is not active, fails the call before anything steps.
    pub fn step(&mut self, actions: &[u8]) -> Result<BatchStep, EnvError> {
        let raw: Vec<i64> = actions.iter().map(|&a| a as i64).collect();
        self.step_raw(&raw)
    }

    pub fn step_raw(&mut self, actions: &[i64]) -> Result<BatchStep, EnvError> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::BatchSizeMismatch {
                expected: self.envs.len(),
                got: actions.len(),
            });
        }
        if let Some(env) = self.envs.iter().find(|e| !e.is_active()) {
            return Err(env.inactive_error());
        }

        let mut batch = BatchStep::with_capacity(self.envs.len());
        for (i, (env, &action)) in self.envs.iter_mut().zip(actions).enumerate() {
            let result = env.step_raw(action)?;
            batch.observations[i * OBS_DIM..(i + 1) * OBS_DIM]
                .copy_from_slice(result.observation.as_slice());
            batch.rewards.push(result.reward);
            batch.terminated.push(result.terminated);
            batch.truncated.push(result.truncated);
            batch.infos.push(result.info);
        }
        Ok(batch)
    }

    pub fn env(&self, index: usize) -> Option<&ProspectorEnv> {
        self.envs.get(index)
    }

    pub fn env_mut(&mut self, index: usize) -> Option<&mut ProspectorEnv> {
        self.envs.get_mut(index)
    }

    pub fn seeds(&self) -> Vec<u64> {
        self.envs.iter().map(|e| e.seed()).collect()
    }

    pub fn dones(&self) -> Vec<bool> {
        self.envs.iter().map(|e| e.is_done()).collect()
    }
}
