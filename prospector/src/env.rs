// src/env.rs
//
// Episode shell: reset/step entry points and the seeding protocol.
//
// States: AwaitingReset -> Active -> Done. `reset` (re)enters Active from any
// state; `step` is only legal while Active. Each step runs, in order:
// dispatch -> global dynamics -> termination checks -> reward -> observation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::coerce_code;
use crate::config::EngineConfig;
use crate::observation::{encode_into, Observation};
use crate::reward::{RewardComponents, RewardWeights, TerminalFlags};
use crate::rng::Pcg32;
use crate::ship::{EpisodeStats, ShipState, StepSnapshot};
use crate::world::World;

/// Where the ship is, as reported in `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeContext {
    Station,
    Field,
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Destroyed,
    Stranded,
    EndRun,
    TimeLimit,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::Destroyed => "destroyed",
            TerminationReason::Stranded => "stranded",
            TerminationReason::EndRun => "end_run",
            TerminationReason::TimeLimit => "time_limit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodePhase {
    AwaitingReset,
    Active,
    Done,
}

/// Per-step metrics. Field names and meanings are consumed by replay and
/// evaluation tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Action code actually executed (after coercion); -1 on reset.
    pub action: i16,
    /// Action as supplied by the caller; -1 on reset.
    pub action_received: i64,
    /// Ticks elapsed this step.
    pub dt: u16,
    pub invalid_action: bool,
    pub credits: f32,
    /// Credits minus total station spend.
    pub net_profit: f32,
    pub profit_per_tick: f32,
    /// 0 if the ship was destroyed or stranded.
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
    pub terminated: bool,
    pub truncated: bool,
    pub node_context: NodeContext,
    pub termination_reason: Option<TerminationReason>,
    /// Reward breakdown; `None` on reset.
    pub reward_components: Option<RewardComponents>,
}

/// Info keys compared numerically by the parity harness, in comparison order.
pub const NUMERIC_INFO_KEYS: [&str; 13] = [
    "credits",
    "net_profit",
    "profit_per_tick",
    "survival",
    "overheat_ticks",
    "pirate_encounters",
    "value_lost_to_pirates",
    "fuel_used",
    "hull_damage",
    "tool_wear",
    "scan_count",
    "mining_ticks",
    "cargo_utilization_avg",
];

impl StepInfo {
    /// Values for [`NUMERIC_INFO_KEYS`], same order.
    pub fn numeric_values(&self) -> [f32; 13] {
        [
            self.credits,
            self.net_profit,
            self.profit_per_tick,
            self.survival,
            self.overheat_ticks,
            self.pirate_encounters,
            self.value_lost_to_pirates,
            self.fuel_used,
            self.hull_damage,
            self.tool_wear,
            self.scan_count,
            self.mining_ticks,
            self.cargo_utilization_avg,
        ]
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

impl StepResult {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Usage errors. Simulation events (invalid actions, destruction) are never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// `step` called before the first `reset`.
    NotReset,
    /// `step` called after the episode terminated or truncated.
    EpisodeDone,
    /// Batched call with the wrong number of entries.
    BatchSizeMismatch { expected: usize, got: usize },
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::NotReset => write!(f, "step() called before reset()"),
            EnvError::EpisodeDone => {
                write!(f, "episode ended; call reset() before step()")
            }
            EnvError::BatchSizeMismatch { expected, got } => {
                write!(f, "batch size mismatch: expected {}, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for EnvError {}

/// One episode instance. Owns all of its state; instances share nothing.
#[derive(Debug, Clone)]
pub struct ProspectorEnv {
    pub(crate) config: EngineConfig,
    pub(crate) weights: RewardWeights,
    pub(crate) rng: Pcg32,
    pub(crate) seed: u64,
    pub(crate) world: World,
    pub(crate) ship: ShipState,
    pub(crate) stats: EpisodeStats,
    pub(crate) phase: EpisodePhase,
}

impl ProspectorEnv {
    /// Build an instance seeded with `seed`. The world is generated eagerly,
    /// but `step` still requires a `reset` first.
    ///
    /// Non-positive tunables fall back to their defaults.
    pub fn new(config: EngineConfig, seed: u64) -> Self {
        let config = config.sanitized();
        let mut rng = Pcg32::new(seed);
        let world = World::generate(&mut rng);
        let ship = ShipState::new(config.time_max);
        let stats = EpisodeStats::starting_from(&ship);
        Self {
            config,
            weights: RewardWeights::with_invalid_penalty(config.invalid_action_penalty),
            rng,
            seed,
            world,
            ship,
            stats,
            phase: EpisodePhase::AwaitingReset,
        }
    }

    /// Start a new episode.
    ///
    /// With a seed the PRNG is re-seeded. Without one the current stream
    /// continues, so the next world differs from the last.
    pub fn reset(&mut self, seed: Option<u64>) -> (Observation, StepInfo) {
        if let Some(seed) = seed {
            self.seed = seed;
            self.rng = Pcg32::new(seed);
        }
        self.world = World::generate(&mut self.rng);
        self.ship = ShipState::new(self.config.time_max);
        self.stats = EpisodeStats::starting_from(&self.ship);
        self.phase = EpisodePhase::Active;

        let info = self.build_info(-1, -1, 0, false, TerminalFlags::default(), false, None, None);
        (self.observe(), info)
    }

    pub fn step(&mut self, action: u8) -> Result<StepResult, EnvError> {
        self.step_raw(action as i64)
    }

    /// Step with an arbitrary integer; anything outside 0..=68 is an invalid action.
    pub fn step_raw(&mut self, action: i64) -> Result<StepResult, EnvError> {
        if !self.is_active() {
            return Err(self.inactive_error());
        }

        let before = self.snapshot();
        let outcome = self.dispatch(coerce_code(action));
        let dt = outcome.dt;

        self.apply_global_dynamics(dt);
        self.ship.ticks_elapsed += dt as u32;

        let destroyed = self.ship.hull <= 0.0;
        let stranded = self.ship.fuel <= 0.0 && !self.at_station();
        let terminated = outcome.end_run || destroyed || stranded;
        let truncated = self.ship.time_remaining <= 0.0 && !terminated;
        let flags = TerminalFlags {
            destroyed,
            stranded,
            done: terminated || truncated,
        };

        let after = self.snapshot();
        let components = RewardComponents::compute(
            &self.weights,
            &before,
            &after,
            outcome.action,
            dt,
            outcome.invalid,
            flags,
        );
        let reward = components.total();

        let reason = if destroyed {
            Some(TerminationReason::Destroyed)
        } else if stranded {
            Some(TerminationReason::Stranded)
        } else if outcome.end_run {
            Some(TerminationReason::EndRun)
        } else if truncated {
            Some(TerminationReason::TimeLimit)
        } else {
            None
        };

        let info = self.build_info(
            outcome.action as i16,
            action,
            dt,
            outcome.invalid,
            flags,
            truncated,
            reason,
            Some(components),
        );

        if flags.done {
            self.phase = EpisodePhase::Done;
        }

        Ok(StepResult {
            observation: self.observe(),
            reward,
            terminated,
            truncated,
            info,
        })
    }

    pub fn observe(&self) -> Observation {
        Observation::encode(&self.world, &self.ship, self.config.time_max)
    }

    /// Encode into a caller-owned buffer of at least `OBS_DIM` floats.
    pub fn observe_into(&self, out: &mut [f32]) {
        encode_into(&self.world, &self.ship, self.config.time_max, out);
    }

    /// Current metrics without stepping (action -1, dt 0).
    pub fn current_info(&self) -> StepInfo {
        self.build_info(-1, -1, 0, false, TerminalFlags::default(), false, None, None)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == EpisodePhase::Done
    }

    pub fn is_active(&self) -> bool {
        self.phase == EpisodePhase::Active
    }

    /// The error `step` would return in the current phase.
    pub(crate) fn inactive_error(&self) -> EnvError {
        match self.phase {
            EpisodePhase::AwaitingReset => EnvError::NotReset,
            _ => EnvError::EpisodeDone,
        }
    }

    pub fn ship(&self) -> &ShipState {
        &self.ship
    }

    /// Direct access for scenario setup in tests and tools.
    pub fn ship_mut(&mut self) -> &mut ShipState {
        &mut self.ship
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn tick(&self) -> u32 {
        self.ship.ticks_elapsed
    }

    pub(crate) fn at_station(&self) -> bool {
        self.world.is_station(self.ship.current_node)
    }

    pub(crate) fn cargo_value(&self) -> f32 {
        self.world.market.cargo_value(&self.ship.cargo)
    }

    fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            credits: self.ship.credits,
            fuel: self.ship.fuel,
            hull: self.ship.hull,
            heat: self.ship.heat,
            tool_condition: self.ship.tool_condition,
            cargo_value: self.cargo_value(),
            value_lost_to_pirates: self.stats.value_lost_to_pirates,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_info(
        &self,
        action: i16,
        action_received: i64,
        dt: u16,
        invalid_action: bool,
        flags: TerminalFlags,
        truncated: bool,
        termination_reason: Option<TerminationReason>,
        reward_components: Option<RewardComponents>,
    ) -> StepInfo {
        let ship = &self.ship;
        let stats = &self.stats;
        let net_profit = ship.credits - ship.total_spend;
        let profit_per_tick = net_profit / ship.ticks_elapsed.max(1) as f32;
        let terminated = flags.done && !truncated;

        StepInfo {
            action,
            action_received,
            dt,
            invalid_action,
            credits: ship.credits,
            net_profit,
            profit_per_tick,
            survival: if flags.destroyed || flags.stranded {
                0.0
            } else {
                1.0
            },
            overheat_ticks: stats.overheat_ticks as f32,
            pirate_encounters: stats.pirate_encounters as f32,
            value_lost_to_pirates: stats.value_lost_to_pirates,
            fuel_used: (stats.fuel_start - ship.fuel).max(0.0),
            hull_damage: (stats.hull_start - ship.hull).max(0.0),
            tool_wear: (stats.tool_start - ship.tool_condition).max(0.0),
            scan_count: stats.scan_count as f32,
            mining_ticks: stats.mining_ticks as f32,
            cargo_utilization_avg: stats.cargo_utilization_avg(),
            time_remaining: ship.time_remaining,
            terminated,
            truncated,
            node_context: if self.at_station() {
                NodeContext::Station
            } else {
                NodeContext::Field
            },
            termination_reason,
            reward_components,
        }
    }
}
