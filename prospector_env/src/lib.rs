// prospector_env/src/lib.rs
//
// Python bindings for the prospector RL environment.
//
// Gymnasium-shaped API:
// - Env: reset(seed) -> (obs, info); step(action) -> (obs, reward, terminated, truncated, info)
// - VecEnv: N independent instances stepped in one call
//
// Observations are returned as flat float lists of length OBS_DIM. All
// operations are deterministic given seeds.

use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use prospector::{
    BatchStep, ConfigError, EngineConfig, EnvError, ProspectorEnv, StepInfo,
    VecEnv as RustVecEnv, N_ACTIONS, NUMERIC_INFO_KEYS, OBS_DIM,
};

fn env_err(e: EnvError) -> PyErr {
    match e {
        EnvError::BatchSizeMismatch { .. } => PyValueError::new_err(e.to_string()),
        EnvError::NotReset | EnvError::EpisodeDone => PyRuntimeError::new_err(e.to_string()),
    }
}

fn config_err(e: ConfigError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn build_config(time_max: Option<f32>, invalid_action_penalty: Option<f32>) -> PyResult<EngineConfig> {
    let mut cfg = EngineConfig::from_env();
    if let Some(t) = time_max {
        cfg.time_max = t;
    }
    if let Some(p) = invalid_action_penalty {
        cfg.invalid_action_penalty = p;
    }
    cfg.validate().map_err(config_err)?;
    Ok(cfg)
}

/// Convert a StepInfo to a Python dictionary.
fn step_info_to_dict(py: Python<'_>, info: &StepInfo) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);

    dict.set_item("action", info.action)?;
    dict.set_item("action_received", info.action_received)?;
    dict.set_item("dt", info.dt)?;
    dict.set_item("invalid_action", info.invalid_action)?;

    for (key, value) in NUMERIC_INFO_KEYS.iter().zip(info.numeric_values()) {
        dict.set_item(*key, value)?;
    }
    dict.set_item("time_remaining", info.time_remaining)?;

    dict.set_item("terminated", info.terminated)?;
    dict.set_item("truncated", info.truncated)?;
    let context = match info.node_context {
        prospector::NodeContext::Station => "station",
        prospector::NodeContext::Field => "field",
    };
    dict.set_item("node_context", context)?;
    dict.set_item(
        "termination_reason",
        info.termination_reason.map(|r| r.to_string()),
    )?;

    if let Some(rc) = &info.reward_components {
        let parts = PyDict::new_bound(py);
        parts.set_item("sell", rc.sell)?;
        parts.set_item("extract", rc.extract)?;
        parts.set_item("fuel", rc.fuel)?;
        parts.set_item("time", rc.time)?;
        parts.set_item("wear", rc.wear)?;
        parts.set_item("heat", rc.heat)?;
        parts.set_item("damage", rc.damage)?;
        parts.set_item("scan", rc.scan)?;
        parts.set_item("invalid", rc.invalid)?;
        parts.set_item("pirate", rc.pirate)?;
        parts.set_item("terminal", rc.terminal)?;
        dict.set_item("reward_components", parts)?;
    }

    Ok(dict.into())
}

/// Single Gym-style environment.
#[pyclass]
pub struct Env {
    inner: ProspectorEnv,
}

#[pymethods]
impl Env {
    /// Create a new environment.
    ///
    /// Args:
    ///     seed: Seed used when reset() is called without one (default: 0)
    ///     time_max: Episode time budget in ticks (default: 20000)
    ///     invalid_action_penalty: Reward deducted per invalid action (default: 0.01)
    #[new]
    #[pyo3(signature = (seed=0, time_max=None, invalid_action_penalty=None))]
    fn new(seed: u64, time_max: Option<f32>, invalid_action_penalty: Option<f32>) -> PyResult<Self> {
        let cfg = build_config(time_max, invalid_action_penalty)?;
        Ok(Self {
            inner: ProspectorEnv::new(cfg, seed),
        })
    }

    /// Reset the environment.
    ///
    /// Returns:
    ///     Tuple of (observation, info)
    #[pyo3(signature = (seed=None))]
    fn reset(&mut self, py: Python<'_>, seed: Option<u64>) -> PyResult<(Vec<f32>, Py<PyDict>)> {
        let (obs, info) = self.inner.reset(seed);
        Ok((obs.as_slice().to_vec(), step_info_to_dict(py, &info)?))
    }

    /// Take a step. Out-of-range codes are executed as Hold and flagged invalid.
    ///
    /// Returns:
    ///     Tuple of (observation, reward, terminated, truncated, info)
    #[allow(clippy::type_complexity)]
    fn step(
        &mut self,
        py: Python<'_>,
        action: i64,
    ) -> PyResult<(Vec<f32>, f32, bool, bool, Py<PyDict>)> {
        let result = self.inner.step_raw(action).map_err(env_err)?;
        let info = step_info_to_dict(py, &result.info)?;
        Ok((
            result.observation.as_slice().to_vec(),
            result.reward,
            result.terminated,
            result.truncated,
            info,
        ))
    }

    #[getter]
    fn seed(&self) -> u64 {
        self.inner.seed()
    }

    #[getter]
    fn tick(&self) -> u32 {
        self.inner.tick()
    }

    #[getter]
    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    #[getter]
    fn time_max(&self) -> f32 {
        self.inner.config().time_max
    }
}

/// Vectorised environment for parallel rollouts.
///
/// Manages N independent instances; instance i defaults to seed `seed + i`.
#[pyclass]
pub struct VecEnv {
    inner: RustVecEnv,
}

type PyBatch = (Vec<Vec<f32>>, Vec<f32>, Vec<bool>, Vec<bool>, Vec<Py<PyDict>>);

fn batch_to_py(py: Python<'_>, batch: &BatchStep) -> PyResult<PyBatch> {
    let observations = (0..batch.len())
        .map(|i| batch.observation(i).to_vec())
        .collect();
    let infos = batch
        .infos
        .iter()
        .map(|info| step_info_to_dict(py, info))
        .collect::<PyResult<Vec<_>>>()?;
    Ok((
        observations,
        batch.rewards.clone(),
        batch.terminated.clone(),
        batch.truncated.clone(),
        infos,
    ))
}

#[pymethods]
impl VecEnv {
    #[new]
    #[pyo3(signature = (n, seed=0, time_max=None, invalid_action_penalty=None))]
    fn new(
        n: usize,
        seed: u64,
        time_max: Option<f32>,
        invalid_action_penalty: Option<f32>,
    ) -> PyResult<Self> {
        if n == 0 {
            return Err(PyValueError::new_err("n must be > 0"));
        }
        let cfg = build_config(time_max, invalid_action_penalty)?;
        Ok(Self {
            inner: RustVecEnv::new(n, cfg, seed),
        })
    }

    /// Reset every instance.
    ///
    /// Args:
    ///     seeds: Optional list of seeds (one per environment)
    ///
    /// Returns:
    ///     List of observations
    #[pyo3(signature = (seeds=None))]
    fn reset_all(&mut self, seeds: Option<Vec<u64>>) -> PyResult<Vec<Vec<f32>>> {
        if let Some(s) = &seeds {
            if s.len() != self.inner.num_envs() {
                return Err(PyValueError::new_err(format!(
                    "seeds length {} must match num_envs {}",
                    s.len(),
                    self.inner.num_envs()
                )));
            }
        }
        let flat = self.inner.reset_all(seeds.as_deref());
        Ok(flat.chunks(OBS_DIM).map(|c| c.to_vec()).collect())
    }

    /// Reset one instance (typically after it finished).
    #[pyo3(signature = (index, seed=None))]
    fn reset_one(
        &mut self,
        py: Python<'_>,
        index: usize,
        seed: Option<u64>,
    ) -> PyResult<(Vec<f32>, Py<PyDict>)> {
        let (obs, info) = self
            .inner
            .reset_one(index, seed)
            .ok_or_else(|| PyIndexError::new_err(format!("index {} out of range", index)))?;
        Ok((obs, step_info_to_dict(py, &info)?))
    }

    /// Step every instance with one action each.
    ///
    /// Returns:
    ///     Tuple of (observations, rewards, terminated, truncated, infos)
    fn step(&mut self, py: Python<'_>, actions: Vec<i64>) -> PyResult<PyBatch> {
        let batch = self.inner.step_raw(&actions).map_err(env_err)?;
        batch_to_py(py, &batch)
    }

    #[getter]
    fn num_envs(&self) -> usize {
        self.inner.num_envs()
    }

    #[getter]
    fn seeds(&self) -> Vec<u64> {
        self.inner.seeds()
    }

    #[getter]
    fn dones(&self) -> Vec<bool> {
        self.inner.dones()
    }
}

/// Observation length.
#[pyfunction]
fn obs_dim() -> usize {
    OBS_DIM
}

/// Number of discrete action codes.
#[pyfunction]
fn n_actions() -> usize {
    N_ACTIONS
}

#[pymodule]
fn prospector_env(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Env>()?;
    m.add_class::<VecEnv>()?;
    m.add_function(wrap_pyfunction!(obs_dim, m)?)?;
    m.add_function(wrap_pyfunction!(n_actions, m)?)?;
    Ok(())
}
