// src/reward.rs
//
// Scalar reward from a before/after snapshot pair.
//
// r = r_sell + r_extract + r_fuel + r_time + r_wear + r_heat + r_damage
//     + r_scan + r_invalid + r_pirate + r_terminal
//
// Summed in exactly that order (f32 addition is not associative).

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::ship::StepSnapshot;

/// Reward coefficients. All stored as positive magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    pub alpha_extract: f32,
    pub beta_fuel: f32,
    pub gamma_time: f32,
    pub delta_wear: f32,
    pub epsilon_heat: f32,
    pub zeta_damage: f32,
    pub kappa_pirate: f32,
    pub scan_cost: f32,
    /// Heat fraction above which the quadratic heat penalty applies.
    pub heat_safe_frac: f32,
    pub stranded_penalty: f32,
    pub destroyed_penalty: f32,
    pub terminal_bonus: f32,
    pub invalid_action_penalty: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self::with_invalid_penalty(DEFAULT_INVALID_ACTION_PENALTY)
    }
}

impl RewardWeights {
    pub fn with_invalid_penalty(invalid_action_penalty: f32) -> Self {
        Self {
            alpha_extract: REWARD_ALPHA_EXTRACT,
            beta_fuel: REWARD_BETA_FUEL,
            gamma_time: REWARD_GAMMA_TIME,
            delta_wear: REWARD_DELTA_WEAR,
            epsilon_heat: REWARD_EPSILON_HEAT,
            zeta_damage: REWARD_ZETA_DAMAGE,
            kappa_pirate: REWARD_KAPPA_PIRATE,
            scan_cost: REWARD_SCAN_COST,
            heat_safe_frac: REWARD_HEAT_SAFE_FRAC,
            stranded_penalty: REWARD_STRANDED_PEN,
            destroyed_penalty: REWARD_DESTROYED_PEN,
            terminal_bonus: REWARD_TERMINAL_BONUS_B,
            invalid_action_penalty,
        }
    }
}

/// How the step ended, as far as reward is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalFlags {
    pub destroyed: bool,
    pub stranded: bool,
    pub done: bool,
}

/// Per-term breakdown of one step's reward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardComponents {
    pub sell: f32,
    pub extract: f32,
    pub fuel: f32,
    pub time: f32,
    pub wear: f32,
    pub heat: f32,
    pub damage: f32,
    pub scan: f32,
    pub invalid: f32,
    pub pirate: f32,
    pub terminal: f32,
}

impl RewardComponents {
    /// Evaluate every term.
    ///
    /// `action` is the post-coercion code; a failed scan still pays the scan cost.
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        weights: &RewardWeights,
        before: &StepSnapshot,
        after: &StepSnapshot,
        action: u8,
        dt: u16,
        invalid: bool,
        flags: TerminalFlags,
    ) -> Self {
        let sell = (after.credits - before.credits) / CREDIT_SCALE;

        let delta_cargo_value = (after.cargo_value - before.cargo_value).max(0.0);
        let extract = weights.alpha_extract * (delta_cargo_value / CREDIT_SCALE);

        let fuel = -weights.beta_fuel * (before.fuel - after.fuel).max(0.0) / 100.0;
        let time = -weights.gamma_time * dt as f32;
        let wear = -weights.delta_wear * (before.tool_condition - after.tool_condition).max(0.0) / 10.0;
        let damage = -weights.zeta_damage * (before.hull - after.hull).max(0.0) / 10.0;

        let heat_safe = weights.heat_safe_frac * HEAT_MAX;
        let heat_term = (after.heat - heat_safe).max(0.0) / HEAT_MAX;
        let heat = -weights.epsilon_heat * heat_term * heat_term;

        let scan = if matches!(action, 8..=10) {
            -weights.scan_cost
        } else {
            0.0
        };
        let invalid = if invalid {
            -weights.invalid_action_penalty
        } else {
            0.0
        };

        let pirate_loss = (after.value_lost_to_pirates - before.value_lost_to_pirates).max(0.0);
        let pirate = -weights.kappa_pirate * (pirate_loss / CREDIT_SCALE);

        let mut terminal = 0.0f32;
        if flags.stranded {
            terminal -= weights.stranded_penalty;
        }
        if flags.destroyed {
            terminal -= weights.destroyed_penalty;
        }
        if flags.done && !flags.destroyed && !flags.stranded {
            terminal += weights.terminal_bonus * (after.credits / CREDIT_SCALE);
        }

        Self {
            sell,
            extract,
            fuel,
            time,
            wear,
            heat,
            damage,
            scan,
            invalid,
            pirate,
            terminal,
        }
    }

    pub fn total(&self) -> f32 {
        self.sell
            + self.extract
            + self.fuel
            + self.time
            + self.wear
            + self.heat
            + self.damage
            + self.scan
            + self.invalid
            + self.pirate
            + self.terminal
    }
}
