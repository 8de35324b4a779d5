// src/dynamics.rs
//
// Passive per-step dynamics, scaled by the dt the dispatcher returned.
//
// Order: time, heat dissipation, buff decay, overheat damage, node hazard +
// pirate roll (off-station only), market, gauge clamping, cargo utilisation.

use crate::constants::*;
use crate::dispatch::sigmoid;
use crate::env::ProspectorEnv;
use crate::rng::Pcg32;
use crate::world::Market;

impl ProspectorEnv {
    pub(crate) fn apply_global_dynamics(&mut self, dt: u16) {
        let dtf = dt as f32;
        let ship = &mut self.ship;

        ship.time_remaining -= dtf;
        ship.heat = (ship.heat - HEAT_DISSIPATION_PER_TICK * dtf).max(0.0);

        ship.escape_buff_ticks = ship.escape_buff_ticks.saturating_sub(dt);
        for ticks in ship.stabilize_buff_ticks.iter_mut() {
            *ticks = ticks.saturating_sub(dt);
        }

        if ship.heat > HEAT_MAX {
            let overflow = ship.heat - HEAT_MAX;
            ship.hull -= OVERHEAT_DAMAGE_PER_UNIT * overflow;
            ship.heat = HEAT_MAX;
            self.stats.overheat_ticks += dt as u32;
        }

        if !self.at_station() {
            self.apply_node_hazards(dt);
            let pirate = self.world.nodes[self.ship.current_node as usize].pirate;
            self.maybe_pirate_encounter(dt, pirate);
        }

        self.world
            .market
            .evolve(&mut self.rng, self.ship.ticks_elapsed, dt);
        self.ship.clamp_gauges(self.config.time_max);

        let util = (self.ship.cargo_sum() / CARGO_MAX).clamp(0.0, 1.0);
        self.stats.cargo_util_sum += util * dtf;
        self.stats.cargo_util_count += dtf;
    }

    fn apply_node_hazards(&mut self, dt: u16) {
        let hazard = self.world.nodes[self.ship.current_node as usize].hazard;
        if hazard <= 0.0 {
            return;
        }
        let dtf = dt as f32;
        let hull_damage = dtf * hazard * HAZARD_DAMAGE_PER_TICK * self.rng.uniform(0.8, 1.2);
        self.ship.hull -= hull_damage;
        self.ship.heat += dtf * hazard * HAZARD_HEAT_PER_TICK;
        self.ship.alert += dtf * hazard * HAZARD_ALERT_PER_TICK;
    }

    /// Roll for a pirate encounter over `dt` ticks at the given intensity.
    ///
    /// Never fires at the station. Consumes one draw when no encounter happens.
    pub(crate) fn maybe_pirate_encounter(&mut self, dt: u16, intensity: f32) {
        if self.at_station() {
            return;
        }

        let cargo_value_before = self.cargo_value();
        let escape = if self.ship.escape_active() { 1.0 } else { 0.0 };
        let logit = PIRATE_BIAS
            + PIRATE_INTENSITY_W * intensity
            + PIRATE_ALERT_W * (self.ship.alert / ALERT_MAX).clamp(0.0, 1.0)
            + PIRATE_CARGO_W * (cargo_value_before / CREDIT_SCALE).ln_1p()
            - PIRATE_ESCAPE_W * escape;

        let per_tick = sigmoid(logit);
        let p_encounter = 1.0 - (1.0 - per_tick).powf(dt.max(1) as f32);
        if self.rng.next_f32() >= p_encounter {
            return;
        }

        self.stats.pirate_encounters += 1;

        let mut loss_frac = self.rng.uniform(0.08, 0.20);
        if self.ship.decoys > 0 && self.rng.next_f32() < DECOY_ABSORB_PROB {
            self.ship.decoys -= 1;
            loss_frac *= DECOY_LOSS_MULT;
        }
        for qty in self.ship.cargo.iter_mut() {
            *qty *= 1.0 - loss_frac;
        }

        let cargo_value_after = self.cargo_value();
        if cargo_value_before > cargo_value_after {
            self.stats.value_lost_to_pirates += cargo_value_before - cargo_value_after;
        }

        self.ship.hull -= self.rng.uniform(1.0, 4.0);
        self.ship.alert += PIRATE_ALERT_GAIN;
    }
}

impl Market {
    /// Advance prices to tick `ticks_elapsed + dt`.
    ///
    /// Price = seasonal cycle - inventory pressure - sales pressure + noise,
    /// clamped per commodity. Noise scales with sqrt(dt).
    pub(crate) fn evolve(&mut self, rng: &mut Pcg32, ticks_elapsed: u32, dt: u16) {
        let t = (ticks_elapsed + dt as u32) as f32;

        for m in self.commodities.iter_mut() {
            m.prev_price = m.price;
        }

        for (c, m) in self.commodities.iter_mut().enumerate() {
            let cycle =
                m.amplitude * (2.0 * std::f32::consts::PI * (t / m.period) + m.phase).sin();
            let inventory_pressure = INVENTORY_PRESSURE_K * m.inventory;
            let sales_pressure = SALES_PRESSURE_K * m.recent_sales;
            let noise_std = MARKET_NOISE_K * PRICE_BASE[c] * (dt.max(1) as f32).sqrt();
            let noise = rng.normal(0.0, noise_std);

            let price = PRICE_BASE[c] + cycle - inventory_pressure - sales_pressure + noise;
            m.price = price.clamp(PRICE_MIN[c], PRICE_MAX[c]);
        }

        let decay = (-(dt as f32) / SALES_DECAY_TAU).exp();
        for m in self.commodities.iter_mut() {
            m.recent_sales *= decay;
            m.inventory = (m.inventory * INVENTORY_DECAY).max(0.0);
        }
    }
}
