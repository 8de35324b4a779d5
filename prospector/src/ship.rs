// src/ship.rs
//
// Ship gauges, per-episode counters, and the pre-step snapshot used by reward.

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Mutable ship state, reset to a fixed loadout on every episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipState {
    pub fuel: f32,
    pub hull: f32,
    pub heat: f32,
    pub tool_condition: f32,
    pub alert: f32,
    pub time_remaining: f32,
    pub credits: f32,
    pub cargo: [f32; N_COMMODITIES],

    pub repair_kits: u8,
    pub stabilizers: u8,
    pub decoys: u8,

    pub escape_buff_ticks: u16,
    /// Indexed by asteroid slot, shared across nodes.
    pub stabilize_buff_ticks: [u16; MAX_ASTEROIDS],

    pub current_node: u8,
    pub selected_asteroid: Option<u8>,

    pub ticks_elapsed: u32,
    /// Credits paid out at the station (purchases and overhauls).
    pub total_spend: f32,
}

impl ShipState {
    pub fn new(time_max: f32) -> Self {
        Self {
            fuel: FUEL_MAX,
            hull: HULL_MAX,
            heat: 0.0,
            tool_condition: TOOL_MAX,
            alert: 0.0,
            time_remaining: time_max,
            credits: 0.0,
            cargo: [0.0; N_COMMODITIES],
            repair_kits: INITIAL_REPAIR_KITS,
            stabilizers: INITIAL_STABILIZERS,
            decoys: INITIAL_DECOYS,
            escape_buff_ticks: 0,
            stabilize_buff_ticks: [0; MAX_ASTEROIDS],
            current_node: 0,
            selected_asteroid: None,
            ticks_elapsed: 0,
            total_spend: 0.0,
        }
    }

    pub fn cargo_sum(&self) -> f32 {
        let mut total = 0.0f32;
        for qty in &self.cargo {
            total += qty;
        }
        total
    }

    pub fn escape_active(&self) -> bool {
        self.escape_buff_ticks > 0
    }

    /// Clamp every gauge to its documented range and rescale an overfull hold.
    pub fn clamp_gauges(&mut self, time_max: f32) {
        self.fuel = self.fuel.clamp(0.0, FUEL_MAX);
        self.hull = self.hull.clamp(0.0, HULL_MAX);
        self.heat = self.heat.clamp(0.0, HEAT_MAX);
        self.tool_condition = self.tool_condition.clamp(0.0, TOOL_MAX);
        self.alert = self.alert.clamp(0.0, ALERT_MAX);
        self.time_remaining = self.time_remaining.clamp(0.0, time_max);

        let mut total = 0.0f32;
        for qty in self.cargo.iter_mut() {
            *qty = qty.clamp(0.0, CARGO_MAX);
            total += *qty;
        }
        if total > CARGO_MAX {
            let scale = CARGO_MAX / total;
            for qty in self.cargo.iter_mut() {
                *qty *= scale;
            }
        }
    }
}

/// Lifetime counters, reported through `info` only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub overheat_ticks: u32,
    pub pirate_encounters: u32,
    pub value_lost_to_pirates: f32,
    pub scan_count: u32,
    pub mining_ticks: u32,
    pub cargo_util_sum: f32,
    pub cargo_util_count: f32,
    pub fuel_start: f32,
    pub hull_start: f32,
    pub tool_start: f32,
}

impl EpisodeStats {
    pub fn starting_from(ship: &ShipState) -> Self {
        Self {
            fuel_start: ship.fuel,
            hull_start: ship.hull,
            tool_start: ship.tool_condition,
            ..Self::default()
        }
    }

    /// Time-weighted cargo utilisation, 0 before any tick has elapsed.
    pub fn cargo_utilization_avg(&self) -> f32 {
        if self.cargo_util_count > 0.0 {
            (self.cargo_util_sum / self.cargo_util_count).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// State captured before dispatch; reward is a function of this and the post-step state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub credits: f32,
    pub fuel: f32,
    pub hull: f32,
    pub heat: f32,
    pub tool_condition: f32,
    pub cargo_value: f32,
    pub value_lost_to_pirates: f32,
}
