// src/ffi.rs
//
// C ABI for native consumers.
//
// A config struct, an opaque state handle, and a flat step-result record
// whose field order is fixed. All functions accept null pointers and do
// nothing (or write nothing) in that case.
//
// Unlike the Rust API, a freshly created handle is immediately steppable,
// and stepping a finished episode yields the "needs reset" record
// (terminated = 1, invalid_action = 1, dt = 0, action = -1) instead of an error.

use std::ptr;
use std::slice;

use crate::action::HOLD_CODE;
use crate::config::EngineConfig;
use crate::constants::OBS_DIM;
use crate::env::{ProspectorEnv, StepInfo};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProspectorCoreConfig {
    pub time_max: f32,
    pub invalid_action_penalty: f32,
}

impl From<ProspectorCoreConfig> for EngineConfig {
    fn from(c: ProspectorCoreConfig) -> Self {
        EngineConfig {
            time_max: c.time_max,
            invalid_action_penalty: c.invalid_action_penalty,
        }
    }
}

impl From<EngineConfig> for ProspectorCoreConfig {
    fn from(c: EngineConfig) -> Self {
        ProspectorCoreConfig {
            time_max: c.time_max,
            invalid_action_penalty: c.invalid_action_penalty,
        }
    }
}

/// Flat step record; field order is part of the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ProspectorCoreStepResult {
    pub obs: [f32; OBS_DIM],
    pub reward: f32,
    pub terminated: u8,
    pub truncated: u8,
    pub invalid_action: u8,
    pub dt: u16,
    pub action: i16,

    pub credits: f32,
    pub net_profit: f32,
    pub profit_per_tick: f32,
    pub survival: f32,
    pub overheat_ticks: f32,
    pub pirate_encounters: f32,
    pub value_lost_to_pirates: f32,
    pub fuel_used: f32,
    pub hull_damage: f32,
    pub tool_wear: f32,
    pub scan_count: f32,
    pub mining_ticks: f32,
    pub cargo_utilization_avg: f32,
    pub time_remaining: f32,
}

impl ProspectorCoreStepResult {
    pub fn zeroed() -> Self {
        Self {
            obs: [0.0; OBS_DIM],
            reward: 0.0,
            terminated: 0,
            truncated: 0,
            invalid_action: 0,
            dt: 0,
            action: 0,
            credits: 0.0,
            net_profit: 0.0,
            profit_per_tick: 0.0,
            survival: 0.0,
            overheat_ticks: 0.0,
            pirate_encounters: 0.0,
            value_lost_to_pirates: 0.0,
            fuel_used: 0.0,
            hull_damage: 0.0,
            tool_wear: 0.0,
            scan_count: 0.0,
            mining_ticks: 0.0,
            cargo_utilization_avg: 0.0,
            time_remaining: 0.0,
        }
    }

    fn fill_metrics(&mut self, info: &StepInfo) {
        self.credits = info.credits;
        self.net_profit = info.net_profit;
        self.profit_per_tick = info.profit_per_tick;
        self.survival = info.survival;
        self.overheat_ticks = info.overheat_ticks;
        self.pirate_encounters = info.pirate_encounters;
        self.value_lost_to_pirates = info.value_lost_to_pirates;
        self.fuel_used = info.fuel_used;
        self.hull_damage = info.hull_damage;
        self.tool_wear = info.tool_wear;
        self.scan_count = info.scan_count;
        self.mining_ticks = info.mining_ticks;
        self.cargo_utilization_avg = info.cargo_utilization_avg;
        self.time_remaining = info.time_remaining;
    }
}

/// Step `env` and fill `out`, handling the needs-reset case.
pub fn step_into(env: &mut ProspectorEnv, action: u8, out: &mut ProspectorCoreStepResult) {
    *out = ProspectorCoreStepResult::zeroed();
    match env.step(action) {
        Ok(result) => {
            out.obs.copy_from_slice(result.observation.as_slice());
            out.reward = result.reward;
            out.terminated = result.terminated as u8;
            out.truncated = result.truncated as u8;
            out.invalid_action = result.info.invalid_action as u8;
            out.dt = result.info.dt;
            out.action = result.info.action;
            out.fill_metrics(&result.info);
        }
        Err(_) => {
            env.observe_into(&mut out.obs);
            out.action = -1;
            out.terminated = 1;
            out.invalid_action = 1;
            out.fill_metrics(&env.current_info());
        }
    }
}

/// # Safety
/// `config` is null or points to a writable config struct.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_default_config(config: *mut ProspectorCoreConfig) {
    if let Some(config) = config.as_mut() {
        *config = EngineConfig::default().into();
    }
}

/// Allocate an instance seeded with `seed`, ready to step.
///
/// A null `config` means defaults. Free with [`prospector_core_destroy`].
///
/// # Safety
/// `config` is null or points to a readable config struct.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_create(
    config: *const ProspectorCoreConfig,
    seed: u64,
) -> *mut ProspectorEnv {
    let config = config
        .as_ref()
        .map(|c| EngineConfig::from(*c))
        .unwrap_or_default();
    let mut env = ProspectorEnv::new(config, seed);
    env.reset(Some(seed));
    Box::into_raw(Box::new(env))
}

/// # Safety
/// `state` must come from [`prospector_core_create`] and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_destroy(state: *mut ProspectorEnv) {
    if !state.is_null() {
        drop(Box::from_raw(state));
    }
}

/// # Safety
/// `obs_out` is null or points to `OBS_DIM` writable floats.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_reset(state: *mut ProspectorEnv, seed: u64, obs_out: *mut f32) {
    let Some(env) = state.as_mut() else { return };
    env.reset(Some(seed));
    if !obs_out.is_null() {
        env.observe_into(slice::from_raw_parts_mut(obs_out, OBS_DIM));
    }
}

/// # Safety
/// `out` is null or points to a writable step record.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_step(
    state: *mut ProspectorEnv,
    action: u8,
    out: *mut ProspectorCoreStepResult,
) {
    let (Some(env), Some(out)) = (state.as_mut(), out.as_mut()) else {
        return;
    };
    step_into(env, action, out);
}

/// Reset `count` instances. A null `seeds` reuses each instance's stored seed.
///
/// # Safety
/// `states` points to `count` handles (null entries are skipped); `seeds` is
/// null or holds `count` values; `obs_out` is null or holds `count * OBS_DIM` floats.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_reset_many(
    states: *const *mut ProspectorEnv,
    seeds: *const u64,
    count: u32,
    obs_out: *mut f32,
) {
    if states.is_null() || count == 0 {
        return;
    }
    let states = slice::from_raw_parts(states, count as usize);
    for (i, &state) in states.iter().enumerate() {
        let Some(env) = state.as_mut() else { continue };
        let seed = if seeds.is_null() {
            env.seed()
        } else {
            *seeds.add(i)
        };
        let obs_ptr = if obs_out.is_null() {
            ptr::null_mut()
        } else {
            obs_out.add(i * OBS_DIM)
        };
        prospector_core_reset(env, seed, obs_ptr);
    }
}

/// Step `count` instances. A null `actions` steps every instance with Hold.
///
/// # Safety
/// `states` points to `count` handles (null entries are skipped); `actions`
/// is null or holds `count` codes; `out_results` is null or holds `count` records.
#[no_mangle]
pub unsafe extern "C" fn prospector_core_step_many(
    states: *const *mut ProspectorEnv,
    actions: *const u8,
    count: u32,
    out_results: *mut ProspectorCoreStepResult,
) {
    if states.is_null() || count == 0 {
        return;
    }
    let states = slice::from_raw_parts(states, count as usize);
    let mut scratch = ProspectorCoreStepResult::zeroed();
    for (i, &state) in states.iter().enumerate() {
        let Some(env) = state.as_mut() else { continue };
        let action = if actions.is_null() {
            HOLD_CODE
        } else {
            *actions.add(i)
        };
        let out = if out_results.is_null() {
            &mut scratch
        } else {
            &mut *out_results.add(i)
        };
        step_into(env, action, out);
    }
}
