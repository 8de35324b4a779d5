//! Prospector core library.
//!
//! A deterministic, single-threaded asteroid-mining simulation exposed as a
//! Gym-style environment. The binary (`src/main.rs`) is a thin rollout /
//! parity harness around these components.
//!
//! # Architecture
//!
//! - **Engine** (`rng`, `world`, `ship`, `dispatch`, `dynamics`,
//!   `observation`, `reward`): pure, I/O-free simulation. Given a seed and an
//!   action sequence every run is bit-identical.
//!
//! - **Episode shell** (`env`): `ProspectorEnv` with `reset` / `step`, the
//!   termination rules and the per-step `StepInfo` metrics.
//!
//! - **Batching** (`vec_env`, `ffi`): N independent instances stepped in one
//!   call, from Rust or through the C ABI.
//!
//! - **Harness** (`policy`, `rollout`, `parity`, `logging`): baseline drivers,
//!   multi-threaded rollouts, trace recording / comparison and JSONL sinks.
//!
//! Frozen contract: observations have [`OBS_DIM`] = 260 floats and there are
//! [`N_ACTIONS`] = 69 action codes.

pub mod action;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod dynamics;
pub mod env;
pub mod ffi;
pub mod logging;
pub mod observation;
pub mod parity;
pub mod policy;
pub mod reward;
pub mod rng;
pub mod rollout;
pub mod ship;
pub mod vec_env;
pub mod world;

// --- Re-exports for ergonomic external use ---------------------------------

pub use action::{coerce_code, Action, FuelPack, MiningMode, ScanMode, SellBucket, Supply};
pub use config::{ConfigError, EngineConfig};
pub use constants::{N_ACTIONS, OBS_DIM};
pub use env::{
    EnvError, EpisodePhase, NodeContext, ProspectorEnv, StepInfo, StepResult, TerminationReason,
    NUMERIC_INFO_KEYS,
};
pub use logging::{EventSink, JsonlSink, NoopSink};
pub use observation::Observation;
pub use parity::{compare, Mismatch, SelfCheckCase, Suite, Tolerances, Trace, TraceError};
pub use policy::{CyclePolicy, Policy, RandomPolicy};
pub use reward::{RewardComponents, RewardWeights};
pub use rng::Pcg32;
pub use rollout::{
    run_episode, run_rollouts, EpisodeSummary, PolicyKind, RolloutAggregate, RolloutConfig,
    RunningStats,
};
pub use ship::{EpisodeStats, ShipState};
pub use vec_env::{BatchStep, VecEnv};
pub use world::{Asteroid, EdgeSlot, Market, Node, NodeType, World};
