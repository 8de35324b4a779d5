// src/dispatch.rs
//
// Action dispatcher: executes one action code against the episode state and
// reports the elapsed ticks.
//
// An invalid action (unknown code or unmet precondition) is not an error.
// The failed branch may already have charged its costs (scans pay fuel and
// alert before checking the selection); afterwards Hold runs and dt is forced
// to 1. An unknown code is first coerced to Hold, so its Hold effect applies
// twice.

use crate::action::{Action, FuelPack, MiningMode, ScanMode, Supply, HOLD_CODE};
use crate::constants::*;
use crate::env::ProspectorEnv;
use crate::observation::selected_is_valid;

/// What the dispatcher did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Code actually executed (out-of-range input becomes Hold).
    pub action: u8,
    pub dt: u16,
    pub invalid: bool,
    /// End Run was requested.
    pub end_run: bool,
}

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Floor at 1e-8, divide by the sum; uniform if the sum is not positive.
pub(crate) fn normalize_probs(values: &mut [f32; N_COMMODITIES]) {
    let mut sum = 0.0f32;
    for v in values.iter_mut() {
        if *v < 1.0e-8 {
            *v = 1.0e-8;
        }
        sum += *v;
    }
    if sum <= 0.0 {
        *values = [1.0 / N_COMMODITIES as f32; N_COMMODITIES];
        return;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

impl ProspectorEnv {
    pub(crate) fn dispatch(&mut self, code: u8) -> DispatchOutcome {
        let (code, mut invalid) = if code as usize >= N_ACTIONS {
            (HOLD_CODE, true)
        } else {
            (code, false)
        };
        let action = Action::decode(code).unwrap_or(Action::Hold);

        let mut end_run = false;
        let result = match action {
            Action::Travel { slot } => self.travel(slot as usize),
            Action::Hold => {
                self.hold();
                Some(1)
            }
            Action::EmergencyBurn => {
                self.emergency_burn();
                Some(1)
            }
            Action::Scan(mode) => self.scan(mode),
            Action::ThreatListen => {
                self.listen_for_threats();
                Some(THREAT_LISTEN_TIME)
            }
            Action::Select { asteroid } => self.select_asteroid(asteroid).then_some(1),
            Action::Mine(mode) => {
                if selected_is_valid(&self.world, &self.ship) {
                    self.mine_selected(mode);
                    Some(1)
                } else {
                    None
                }
            }
            Action::Stabilize => self.stabilize(),
            Action::Refine => {
                self.refine();
                Some(REFINE_TIME)
            }
            Action::Cooldown => {
                self.ship.fuel -= COOLDOWN_FUEL;
                self.ship.heat = (self.ship.heat - COOLDOWN_AMOUNT).max(0.0);
                self.ship.alert += COOLDOWN_ALERT;
                Some(COOLDOWN_TIME)
            }
            Action::Maintenance => self.use_repair_kit(false).then_some(MAINT_TIME),
            Action::HullPatch => self.use_repair_kit(true).then_some(PATCH_TIME),
            Action::Jettison { commodity } => {
                self.ship.cargo[commodity as usize] = 0.0;
                self.ship.alert = (self.ship.alert - JETTISON_ALERT_RELIEF).max(0.0);
                Some(1)
            }
            Action::Dock => {
                if self.at_station() {
                    self.ship.alert = (self.ship.alert - DOCK_ALERT_DROP).max(0.0);
                    Some(DOCK_TIME)
                } else {
                    None
                }
            }
            Action::Sell { commodity, bucket } => {
                if self.at_station() {
                    self.sell(commodity as usize, bucket.fraction());
                    Some(1)
                } else {
                    None
                }
            }
            Action::BuyFuel(pack) => (self.at_station() && self.buy_fuel(pack)).then_some(1),
            Action::BuySupply(kind) => (self.at_station() && self.buy_supply(kind)).then_some(1),
            Action::Overhaul => self.overhaul().then_some(OVERHAUL_TIME),
            Action::EndRun => {
                end_run = true;
                Some(1)
            }
        };

        let dt = match result {
            Some(dt) => dt,
            None => {
                invalid = true;
                1
            }
        };
        let dt = if invalid {
            self.hold();
            1
        } else {
            dt
        };

        DispatchOutcome {
            action: code,
            dt,
            invalid,
            end_run,
        }
    }

    fn hold(&mut self) {
        self.ship.alert = (self.ship.alert - ALERT_DECAY_HOLD).max(0.0);
        self.ship.heat = (self.ship.heat - HEAT_DISSIPATION_PER_TICK).max(0.0);
    }

    fn emergency_burn(&mut self) {
        self.ship.fuel -= EMERGENCY_BURN_FUEL;
        self.ship.alert += EMERGENCY_BURN_ALERT;
        self.ship.escape_buff_ticks = self.ship.escape_buff_ticks.max(ESCAPE_BUFF_TICKS);
    }

    fn travel(&mut self, slot: usize) -> Option<u16> {
        let edge = *self.world.edge(self.ship.current_node, slot)?;
        let dt = (edge.travel_time as u16).max(1);

        let mass_factor = 1.0 + 0.5 * (self.ship.cargo_sum() / CARGO_MAX);
        self.ship.fuel -= edge.fuel_cost * mass_factor;
        self.ship.current_node = edge.to;
        self.ship.selected_asteroid = None;

        // En-route exposure scales with the true threat of the edge.
        let threat = edge.threat_true;
        let mut hull_damage = dt as f32 * threat * HAZARD_DAMAGE_PER_TICK;
        hull_damage *= self.rng.uniform(0.85, 1.15);
        self.ship.hull -= hull_damage;
        self.ship.heat += dt as f32 * threat * HAZARD_HEAT_PER_TICK;
        self.ship.alert += dt as f32 * threat * HAZARD_ALERT_PER_TICK;
        self.maybe_pirate_encounter(dt, threat);

        Some(dt)
    }

    /// Scans pay their costs up front, even when they turn out to be invalid.
    fn scan(&mut self, mode: ScanMode) -> Option<u16> {
        let (dt, fuel, alert) = mode.cost();
        self.ship.fuel -= fuel;
        self.ship.alert += alert;

        match mode {
            ScanMode::Wide => {
                let node = self.ship.current_node as usize;
                for a_idx in 0..MAX_ASTEROIDS {
                    if self.world.asteroids[node][a_idx].is_some() {
                        self.update_asteroid_estimate(a_idx, mode);
                    }
                }
            }
            ScanMode::Focused | ScanMode::Deep => {
                let selected = self.ship.selected_asteroid;
                match selected {
                    Some(a_idx) if selected_is_valid(&self.world, &self.ship) => {
                        self.update_asteroid_estimate(a_idx as usize, mode);
                    }
                    _ => return None,
                }
            }
        }

        self.stats.scan_count += 1;
        Some(dt)
    }

    fn update_asteroid_estimate(&mut self, a_idx: usize, mode: ScanMode) {
        let (blend, conf_gain, noise_mult) = mode.update_params();
        let node = self.ship.current_node;
        let rng = &mut self.rng;
        let Some(asteroid) = self.world.asteroid_mut(node, a_idx) else {
            return;
        };

        let sigma = asteroid.noise_profile * (1.0 - asteroid.scan_conf + 0.1) * noise_mult;

        let mut noisy = [0.0f32; N_COMMODITIES];
        for (dst, &truth) in noisy.iter_mut().zip(asteroid.true_comp.iter()) {
            *dst = truth + rng.normal(0.0, sigma);
        }
        normalize_probs(&mut noisy);

        let mut mixed = [0.0f32; N_COMMODITIES];
        for c in 0..N_COMMODITIES {
            mixed[c] = (1.0 - blend) * asteroid.comp_est[c] + blend * noisy[c];
        }
        normalize_probs(&mut mixed);
        asteroid.comp_est = mixed;

        let stable_noisy = (asteroid.stability_true + rng.normal(0.0, sigma)).clamp(0.0, 1.0);
        let stable_est = (1.0 - blend) * asteroid.stability_est + blend * stable_noisy;
        asteroid.stability_est = stable_est.clamp(0.0, 1.0);
        asteroid.scan_conf = (asteroid.scan_conf + conf_gain).clamp(0.0, 1.0);
    }

    /// Only the outgoing slots of the current node are refined; mirror slots keep their estimate.
    fn listen_for_threats(&mut self) {
        let node = self.ship.current_node as usize;
        for slot in self.world.neighbors[node].iter_mut().flatten() {
            let noisy = (slot.threat_true + self.rng.normal(0.0, THREAT_LISTEN_NOISE)).clamp(0.0, 1.0);
            slot.threat_est = 0.25 * slot.threat_est + 0.75 * noisy;
        }
    }

    fn select_asteroid(&mut self, asteroid: u8) -> bool {
        let selectable = self
            .world
            .asteroid(self.ship.current_node, asteroid as usize)
            .map_or(false, |a| a.is_minable());
        if selectable {
            self.ship.selected_asteroid = Some(asteroid);
        }
        selectable
    }

    fn mine_selected(&mut self, mode: MiningMode) {
        let Some(a_idx) = self.ship.selected_asteroid.map(usize::from) else {
            return;
        };
        let node = self.ship.current_node;
        let Some(snapshot) = self.world.asteroid(node, a_idx).copied() else {
            return;
        };
        let profile = mode.profile();

        let base = snapshot.richness * (1.0 - snapshot.depletion).max(0.0);
        let tool_frac = (self.ship.tool_condition / TOOL_MAX).clamp(0.0, 1.0);
        let heat_frac = (self.ship.heat / HEAT_MAX).clamp(0.0, 2.0);

        let eff_tool = 0.4 + 0.6 * tool_frac;
        let eff_heat = if heat_frac <= HEAT_EFFICIENCY_KNEE {
            1.0
        } else {
            (1.0 - (heat_frac - HEAT_EFFICIENCY_KNEE) / 0.3).max(0.1)
        };

        let noise = self.rng.normal(0.0, profile.noise_sigma).exp();
        let mut extracted = [0.0f32; N_COMMODITIES];
        let mut total = 0.0f32;
        for c in 0..N_COMMODITIES {
            extracted[c] =
                base * eff_tool * eff_heat * profile.yield_mult * noise * snapshot.true_comp[c];
            total += extracted[c];
        }

        let available = (CARGO_MAX - self.ship.cargo_sum()).max(0.0);
        if total > available && total > 0.0 {
            let scale = available / total;
            total = available;
            for qty in extracted.iter_mut() {
                *qty *= scale;
            }
        }

        for (held, qty) in self.ship.cargo.iter_mut().zip(extracted.iter()) {
            *held += qty;
        }
        self.ship.heat += profile.heat_gain;
        self.ship.tool_condition -= profile.wear_gain;
        self.ship.alert += profile.alert_gain;
        self.stats.mining_ticks += 1;

        let stabilized = self.ship.stabilize_buff_ticks[a_idx] > 0;
        // Fracture risk uses the tool and heat fractions from before this swing.
        let logit = -3.1
            + profile.fracture_bias
            + 2.5 * (1.0 - snapshot.stability_true)
            + 2.2 * (heat_frac - HEAT_EFFICIENCY_KNEE).max(0.0)
            + 1.5 * (1.0 - tool_frac)
            - if stabilized { 1.1 } else { 0.0 };

        if let Some(asteroid) = self.world.asteroid_mut(node, a_idx) {
            asteroid.depletion =
                (asteroid.depletion + FRACTURE_DEPLETION_RATE * total).clamp(0.0, 1.0);
        }

        if self.rng.next_f32() < sigmoid(logit) {
            let severity = self.rng.uniform(0.5, 1.0);
            self.ship.hull -= FRACTURE_HULL_DAMAGE * severity;
            if let Some(asteroid) = self.world.asteroid_mut(node, a_idx) {
                asteroid.depletion = 1.0;
            }
            let hazard = &mut self.world.nodes[node as usize].hazard;
            *hazard = (*hazard + FRACTURE_HAZARD_GAIN).clamp(0.0, 1.0);
        }
    }

    fn stabilize(&mut self) -> Option<u16> {
        let a_idx = self.ship.selected_asteroid?;
        if !selected_is_valid(&self.world, &self.ship) || self.ship.stabilizers == 0 {
            return None;
        }
        self.ship.stabilizers -= 1;
        self.ship.stabilize_buff_ticks[a_idx as usize] = STABILIZE_BUFF_TICKS;
        Some(STABILIZE_TIME)
    }

    /// Convert part of commodities 0 and 1 into commodity 4.
    fn refine(&mut self) {
        self.ship.fuel -= REFINE_FUEL;
        self.ship.heat += REFINE_HEAT;
        self.ship.alert += REFINE_ALERT;

        let cargo = &mut self.ship.cargo;
        let low_value = cargo[0] + cargo[1];
        if low_value <= 0.0 {
            return;
        }
        let input = REFINE_INPUT_FRAC * low_value;
        let take_ratio = (input / low_value).min(1.0);
        cargo[0] *= 1.0 - take_ratio;
        cargo[1] *= 1.0 - take_ratio;
        cargo[4] += REFINE_YIELD * input;
    }

    fn use_repair_kit(&mut self, hull: bool) -> bool {
        if self.ship.repair_kits == 0 {
            return false;
        }
        self.ship.repair_kits -= 1;
        if hull {
            self.ship.hull = (self.ship.hull + HULL_PATCH_AMOUNT).min(HULL_MAX);
        } else {
            self.ship.tool_condition = (self.ship.tool_condition + TOOL_REPAIR_AMOUNT).min(TOOL_MAX);
        }
        true
    }

    fn sell(&mut self, commodity: usize, fraction: f32) {
        let qty = self.ship.cargo[commodity] * fraction;
        if qty <= 0.0 {
            return;
        }
        let market = &mut self.world.market.commodities[commodity];
        let slip = slippage(qty, market.inventory);
        let effective_price = market.price * (1.0 - slip);

        self.ship.credits += qty * effective_price;
        self.ship.cargo[commodity] = (self.ship.cargo[commodity] - qty).max(0.0);
        market.inventory += qty;
        market.recent_sales += qty;
    }

    fn buy_fuel(&mut self, pack: FuelPack) -> bool {
        let (qty, cost) = pack.terms();
        if self.ship.credits < cost {
            return false;
        }
        self.ship.credits -= cost;
        self.ship.total_spend += cost;
        self.ship.fuel = (self.ship.fuel + qty).min(FUEL_MAX);
        true
    }

    fn buy_supply(&mut self, kind: Supply) -> bool {
        let cost = kind.cost();
        let held = match kind {
            Supply::RepairKit => &mut self.ship.repair_kits,
            Supply::Stabilizer => &mut self.ship.stabilizers,
            Supply::Decoy => &mut self.ship.decoys,
        };
        if self.ship.credits < cost || *held >= kind.cap() {
            return false;
        }
        *held += 1;
        self.ship.credits -= cost;
        self.ship.total_spend += cost;
        true
    }

    fn overhaul(&mut self) -> bool {
        if !self.at_station() || self.ship.credits < OVERHAUL_COST {
            return false;
        }
        self.ship.credits -= OVERHAUL_COST;
        self.ship.total_spend += OVERHAUL_COST;
        self.ship.hull = HULL_MAX;
        self.ship.tool_condition = TOOL_MAX;
        true
    }
}

/// Price impact of selling `qty` into a station holding `inventory`.
pub fn slippage(qty: f32, inventory: f32) -> f32 {
    if qty <= 0.0 {
        return 0.0;
    }
    let ratio = qty / (inventory + qty).max(1.0);
    (SLIPPAGE_K * ratio + SLIPPAGE_ROOT * ratio.sqrt()).clamp(0.0, SLIPPAGE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn active_env(seed: u64) -> ProspectorEnv {
        let mut env = ProspectorEnv::new(EngineConfig::default(), seed);
        env.reset(Some(seed));
        env
    }

    /// Move the ship to the first field node with asteroids, bypassing travel.
    fn park_at_field(env: &mut ProspectorEnv) -> u8 {
        let node = (1..env.world.node_count)
            .find(|&n| env.world.asteroids[n as usize][0].is_some())
            .expect("field node");
        env.ship.current_node = node;
        node
    }

    #[test]
    fn test_normalize_probs_floors_and_sums_to_one() {
        let mut v = [-1.0, 0.0, 2.0, 1.0, 1.0, 0.0];
        normalize_probs(&mut v);
        let sum: f32 = v.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(v.iter().all(|&x| x > 0.0));
        assert!((v[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_slippage_bounds() {
        assert_eq!(slippage(0.0, 50.0), 0.0);
        let small = slippage(1.0, 100.0);
        let large = slippage(500.0, 10.0);
        assert!(small > 0.0 && small < large);
        assert!(large <= SLIPPAGE_MAX);
        // Zero inventory still has a positive denominator.
        assert!(slippage(0.5, 0.0).is_finite());
    }

    #[test]
    fn test_out_of_range_code_runs_hold_twice() {
        let mut env = active_env(3);
        env.ship.alert = 20.0;
        env.ship.heat = 30.0;
        let out = env.dispatch(200);
        assert_eq!(out.action, HOLD_CODE);
        assert!(out.invalid);
        assert_eq!(out.dt, 1);
        assert_eq!(env.ship.alert, 14.0);
        assert_eq!(env.ship.heat, 25.0);
    }

    #[test]
    fn test_invalid_travel_slot() {
        let mut env = active_env(3);
        let node = env.ship.current_node;
        let empty = (0..MAX_NEIGHBORS).find(|&s| env.world.edge(node, s).is_none());
        if let Some(slot) = empty {
            let out = env.dispatch(slot as u8);
            assert!(out.invalid);
            assert_eq!(env.ship.current_node, node);
        }
    }

    #[test]
    fn test_travel_moves_and_clears_selection() {
        let mut env = active_env(123);
        let edge = *env.world.edge(0, 0).expect("station has a neighbor");
        env.ship.selected_asteroid = Some(3);
        let out = env.dispatch(0);
        assert!(!out.invalid);
        assert_eq!(out.dt, edge.travel_time as u16);
        assert_eq!(env.ship.current_node, edge.to);
        assert_eq!(env.ship.selected_asteroid, None);
        assert!(env.ship.fuel < FUEL_MAX - edge.fuel_cost + 1e-3);
    }

    #[test]
    fn test_focused_scan_without_selection_still_costs() {
        let mut env = active_env(5);
        park_at_field(&mut env);
        let out = env.dispatch(9);
        assert!(out.invalid);
        assert_eq!(env.ship.fuel, FUEL_MAX - FOCUSED_SCAN_FUEL);
        assert_eq!(env.stats.scan_count, 0);
    }

    #[test]
    fn test_wide_scan_raises_confidence_everywhere() {
        let mut env = active_env(5);
        let node = park_at_field(&mut env);
        let out = env.dispatch(8);
        assert!(!out.invalid);
        assert_eq!(out.dt, WIDE_SCAN_TIME);
        assert_eq!(env.stats.scan_count, 1);
        for a in env.world.asteroids[node as usize].iter().flatten() {
            assert!((a.scan_conf - 0.2).abs() < 1e-6);
            let sum: f32 = a.comp_est.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_deep_scan_pulls_estimate_toward_truth() {
        let mut env = active_env(21);
        let node = park_at_field(&mut env);
        assert!(env.select_asteroid(0));
        let truth = env.world.asteroid(node, 0).unwrap().true_comp;
        let err = |est: &[f32; N_COMMODITIES]| -> f32 {
            est.iter().zip(truth.iter()).map(|(a, b)| (a - b).abs()).sum()
        };
        let before = err(&env.world.asteroid(node, 0).unwrap().comp_est);
        for _ in 0..3 {
            let out = env.dispatch(10);
            assert!(!out.invalid);
        }
        let after = err(&env.world.asteroid(node, 0).unwrap().comp_est);
        assert!(after < before, "error {before} -> {after}");
        assert_eq!(env.world.asteroid(node, 0).unwrap().scan_conf, 1.0);
    }

    #[test]
    fn test_threat_listen_updates_outgoing_slots_only() {
        let mut env = active_env(123);
        let out = env.dispatch(11);
        assert_eq!(out.dt, THREAT_LISTEN_TIME);
        let edge = *env.world.edge(0, 0).unwrap();
        assert_ne!(edge.threat_est, THREAT_ESTIMATE_PRIOR);
        let back = env.world.neighbors[edge.to as usize]
            .iter()
            .flatten()
            .find(|e| e.to == 0)
            .unwrap();
        assert_eq!(back.threat_est, THREAT_ESTIMATE_PRIOR);
    }

    #[test]
    fn test_select_rules() {
        let mut env = active_env(8);
        // Station has no asteroids.
        assert!(env.dispatch(12).invalid);

        let node = park_at_field(&mut env);
        assert!(!env.dispatch(12).invalid);
        assert_eq!(env.ship.selected_asteroid, Some(0));

        env.world.asteroid_mut(node, 1).unwrap().depletion = 1.0;
        assert!(env.dispatch(13).invalid);
        assert_eq!(env.ship.selected_asteroid, Some(0));
    }

    #[test]
    fn test_mining_fills_cargo_and_wears_tool() {
        let mut env = active_env(8);
        let node = park_at_field(&mut env);
        assert!(!env.dispatch(12).invalid);

        let out = env.dispatch(28);
        assert!(!out.invalid);
        assert_eq!(env.stats.mining_ticks, 1);
        assert!(env.ship.cargo_sum() > 0.0);
        assert_eq!(env.ship.tool_condition, TOOL_MAX - 0.8);
        assert!(env.world.asteroid(node, 0).unwrap().depletion > 0.0);
    }

    #[test]
    fn test_mining_respects_cargo_capacity() {
        let mut env = active_env(8);
        park_at_field(&mut env);
        env.dispatch(12);
        env.ship.cargo = [0.0, 0.0, 0.0, 0.0, 0.0, 199.9];
        env.dispatch(30);
        assert!(env.ship.cargo_sum() <= CARGO_MAX + 1e-3);
    }

    #[test]
    fn test_mine_without_selection_is_invalid() {
        let mut env = active_env(8);
        park_at_field(&mut env);
        let out = env.dispatch(29);
        assert!(out.invalid);
        assert_eq!(env.stats.mining_ticks, 0);
    }

    #[test]
    fn test_stabilize_consumes_item() {
        let mut env = active_env(8);
        park_at_field(&mut env);
        assert!(env.dispatch(31).invalid);

        env.dispatch(14);
        let out = env.dispatch(31);
        assert!(!out.invalid);
        assert_eq!(out.dt, STABILIZE_TIME);
        assert_eq!(env.ship.stabilizers, INITIAL_STABILIZERS - 1);
        assert_eq!(env.ship.stabilize_buff_ticks[2], STABILIZE_BUFF_TICKS);

        env.ship.stabilizers = 0;
        assert!(env.dispatch(31).invalid);
    }

    #[test]
    fn test_refine_converts_low_value_cargo() {
        let mut env = active_env(1);
        env.ship.cargo = [40.0, 60.0, 0.0, 0.0, 0.0, 0.0];
        let out = env.dispatch(32);
        assert_eq!(out.dt, REFINE_TIME);
        assert!((env.ship.cargo[0] - 34.0).abs() < 1e-4);
        assert!((env.ship.cargo[1] - 51.0).abs() < 1e-4);
        assert!((env.ship.cargo[4] - 9.75).abs() < 1e-4);
        assert_eq!(env.ship.heat, REFINE_HEAT);
    }

    #[test]
    fn test_repair_kits() {
        let mut env = active_env(1);
        env.ship.hull = 50.0;
        env.ship.tool_condition = 90.0;
        assert!(!env.dispatch(35).invalid);
        assert_eq!(env.ship.hull, 70.0);
        assert!(!env.dispatch(34).invalid);
        assert_eq!(env.ship.tool_condition, TOOL_MAX);
        assert_eq!(env.ship.repair_kits, 1);
        env.ship.repair_kits = 0;
        assert!(env.dispatch(34).invalid);
    }

    #[test]
    fn test_jettison_always_valid() {
        let mut env = active_env(1);
        env.ship.cargo[3] = 12.0;
        env.ship.alert = 5.0;
        let out = env.dispatch(39);
        assert!(!out.invalid);
        assert_eq!(env.ship.cargo[3], 0.0);
        assert_eq!(env.ship.alert, 0.0);
    }

    #[test]
    fn test_station_only_actions_rejected_in_field() {
        let mut env = active_env(5);
        park_at_field(&mut env);
        env.ship.credits = 10_000.0;
        env.ship.cargo[0] = 10.0;
        for code in [42u8, 43, 50, 60, 61, 63, 64, 66, 67] {
            let out = env.dispatch(code);
            assert!(out.invalid, "code {code} should be invalid off-station");
        }
        assert_eq!(env.ship.credits, 10_000.0);
        assert_eq!(env.ship.cargo[0], 10.0);
    }

    #[test]
    fn test_sell_at_station() {
        let mut env = active_env(5);
        env.ship.cargo[0] = 80.0;
        let inventory = env.world.market.commodities[0].inventory;
        let out = env.dispatch(44);
        assert!(!out.invalid);
        assert_eq!(env.ship.cargo[0], 40.0);
        assert!(env.ship.credits > 0.0);
        assert_eq!(env.world.market.commodities[0].inventory, inventory + 40.0);
        assert_eq!(env.world.market.commodities[0].recent_sales, 40.0);
    }

    #[test]
    fn test_purchases() {
        let mut env = active_env(5);
        assert!(env.dispatch(61).invalid);

        env.ship.credits = 1000.0;
        env.ship.fuel = 900.0;
        assert!(!env.dispatch(61).invalid);
        assert_eq!(env.ship.fuel, FUEL_MAX);
        assert_eq!(env.ship.credits, 940.0);

        assert!(!env.dispatch(66).invalid);
        assert_eq!(env.ship.decoys, INITIAL_DECOYS + 1);
        assert_eq!(env.ship.total_spend, 60.0 + 110.0);

        env.ship.repair_kits = REPAIR_KITS_CAP;
        assert!(env.dispatch(64).invalid);
    }

    #[test]
    fn test_overhaul() {
        let mut env = active_env(5);
        env.ship.hull = 40.0;
        env.ship.tool_condition = 10.0;
        assert!(env.dispatch(67).invalid);

        env.ship.credits = 300.0;
        let out = env.dispatch(67);
        assert!(!out.invalid);
        assert_eq!(out.dt, OVERHAUL_TIME);
        assert_eq!(env.ship.hull, HULL_MAX);
        assert_eq!(env.ship.tool_condition, TOOL_MAX);
        assert_eq!(env.ship.credits, 20.0);
    }

    #[test]
    fn test_emergency_burn_sets_escape_buff() {
        let mut env = active_env(5);
        let out = env.dispatch(7);
        assert_eq!(out.dt, 1);
        assert_eq!(env.ship.fuel, FUEL_MAX - EMERGENCY_BURN_FUEL);
        assert_eq!(env.ship.escape_buff_ticks, ESCAPE_BUFF_TICKS);
    }

    #[test]
    fn test_end_run_flag() {
        let mut env = active_env(5);
        let out = env.dispatch(68);
        assert!(out.end_run);
        assert!(!out.invalid);
    }
}
