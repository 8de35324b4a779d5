// src/observation.rs
//
// Fixed 260-float observation vector.
//
// Layout (frozen; trained policies index into it directly):
//   0..24    ship scalars, cargo, items, position, node-type one-hot
//   24..68   6 neighbor blocks x 7: present, dest type one-hot (3),
//            travel time, fuel cost, threat estimate
//   68..244  16 asteroid blocks x 11: present, composition estimate (6),
//            stability estimate, depletion, scan confidence, selected
//   244..250 normalised prices
//   250..256 price deltas in [-1, 1]
//   256..260 station inventory for commodities 0, 2, 3, 4
//
// Absent neighbor and asteroid slots are all zeros.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::ship::ShipState;
use crate::world::World;

pub const SHIP_BASE: usize = 0;
pub const NEIGHBOR_BASE: usize = 24;
pub const NEIGHBOR_STRIDE: usize = 7;
pub const ASTEROID_BASE: usize = 68;
pub const ASTEROID_STRIDE: usize = 11;
pub const PRICE_BASE_INDEX: usize = 244;
pub const PRICE_DELTA_INDEX: usize = 250;
pub const INVENTORY_INDEX: usize = 256;

/// Commodities whose station inventory is exposed, in slot order.
pub const OBSERVED_INVENTORY: [usize; 4] = [0, 2, 3, 4];

const INV_MAX_NODE_INDEX: f32 = 1.0 / MAX_NODE_INDEX as f32;
const INV_TRAVEL_TIME_MAX: f32 = 1.0 / TRAVEL_TIME_MAX;
const INV_TRAVEL_FUEL_COST_MAX: f32 = 1.0 / TRAVEL_FUEL_COST_MAX;
const INV_PRICE_SCALE: f32 = 1.0 / PRICE_SCALE;
const INV_STATION_INVENTORY_NORM_CAP: f32 = 1.0 / STATION_INVENTORY_NORM_CAP;

/// Encoded observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub values: Vec<f32>,
}

impl Observation {
    pub fn zeros() -> Self {
        Self {
            values: vec![0.0; OBS_DIM],
        }
    }

    /// Encode the current state.
    pub fn encode(world: &World, ship: &ShipState, time_max: f32) -> Self {
        let mut obs = Self::zeros();
        encode_into(world, ship, time_max, &mut obs.values);
        obs
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Selected flags set across all asteroid blocks.
    pub fn selected_count(&self) -> usize {
        (0..MAX_ASTEROIDS)
            .filter(|a| self.values[ASTEROID_BASE + ASTEROID_STRIDE * a + 10] > 0.5)
            .count()
    }
}

#[inline]
fn unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Write the observation into `out`, which must hold at least `OBS_DIM` floats.
///
/// Every slot is overwritten, so `out` can be reused between steps.
pub fn encode_into(world: &World, ship: &ShipState, time_max: f32, out: &mut [f32]) {
    let obs = &mut out[..OBS_DIM];
    obs.fill(0.0);

    let node = ship.current_node;
    let here = world.nodes[node as usize];

    obs[SHIP_BASE] = unit(ship.fuel / FUEL_MAX);
    obs[1] = unit(ship.hull / HULL_MAX);
    obs[2] = unit(ship.heat / HEAT_MAX);
    obs[3] = unit(ship.tool_condition / TOOL_MAX);
    obs[4] = unit(ship.cargo_sum() / CARGO_MAX);
    obs[5] = unit(ship.alert / ALERT_MAX);
    obs[6] = unit(ship.time_remaining / time_max);
    obs[7] = unit(ship.credits.max(0.0).ln_1p() / CREDITS_CAP.ln_1p());

    for (c, qty) in ship.cargo.iter().enumerate() {
        obs[8 + c] = unit(qty / CARGO_MAX);
    }

    obs[14] = unit(ship.repair_kits as f32 / REPAIR_KITS_CAP as f32);
    obs[15] = unit(ship.stabilizers as f32 / STABILIZERS_CAP as f32);
    obs[16] = unit(ship.decoys as f32 / DECOYS_CAP as f32);

    obs[17] = if world.is_station(node) { 1.0 } else { 0.0 };
    obs[18] = if selected_is_valid(world, ship) { 1.0 } else { 0.0 };
    obs[19 + here.node_type.index()] = 1.0;

    obs[22] = unit(node as f32 * INV_MAX_NODE_INDEX);
    obs[23] = unit(world.steps_to_station(node) as f32 * INV_MAX_NODE_INDEX);

    for (slot, edge) in world.neighbors[node as usize].iter().enumerate() {
        let Some(edge) = edge else { continue };
        let base = NEIGHBOR_BASE + NEIGHBOR_STRIDE * slot;
        obs[base] = 1.0;
        obs[base + 1 + world.nodes[edge.to as usize].node_type.index()] = 1.0;
        obs[base + 4] = unit(edge.travel_time as f32 * INV_TRAVEL_TIME_MAX);
        obs[base + 5] = unit(edge.fuel_cost * INV_TRAVEL_FUEL_COST_MAX);
        obs[base + 6] = unit(edge.threat_est);
    }

    for (a_idx, asteroid) in world.asteroids[node as usize].iter().enumerate() {
        let Some(asteroid) = asteroid else { continue };
        let base = ASTEROID_BASE + ASTEROID_STRIDE * a_idx;
        obs[base] = 1.0;
        write_simplex(&asteroid.comp_est, &mut obs[base + 1..base + 7]);
        obs[base + 7] = unit(asteroid.stability_est);
        obs[base + 8] = unit(asteroid.depletion);
        obs[base + 9] = unit(asteroid.scan_conf);
        obs[base + 10] = if ship.selected_asteroid == Some(a_idx as u8) {
            1.0
        } else {
            0.0
        };
    }

    for (c, m) in world.market.commodities.iter().enumerate() {
        obs[PRICE_BASE_INDEX + c] = unit(m.price * INV_PRICE_BASE[c]);
        obs[PRICE_DELTA_INDEX + c] = ((m.price - m.prev_price) * INV_PRICE_SCALE).clamp(-1.0, 1.0);
    }

    for (i, &c) in OBSERVED_INVENTORY.iter().enumerate() {
        obs[INVENTORY_INDEX + i] =
            unit(world.market.commodities[c].inventory * INV_STATION_INVENTORY_NORM_CAP);
    }
}

/// Floor each component at 1e-8 and normalise by multiplying with the reciprocal sum.
fn write_simplex(src: &[f32; N_COMMODITIES], out: &mut [f32]) {
    let mut sum = 0.0f32;
    for (dst, &v) in out.iter_mut().zip(src.iter()) {
        *dst = v.max(1.0e-8);
        sum += *dst;
    }
    if sum <= 0.0 {
        out.fill(1.0 / N_COMMODITIES as f32);
        return;
    }
    let inv_sum = 1.0 / sum;
    for dst in out.iter_mut() {
        *dst *= inv_sum;
    }
}

/// Selection points at a present, not fully depleted asteroid at the current node.
pub fn selected_is_valid(world: &World, ship: &ShipState) -> bool {
    match ship.selected_asteroid {
        Some(idx) => world
            .asteroid(ship.current_node, idx as usize)
            .map_or(false, |a| a.is_minable()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Pcg32;

    fn fresh(seed: u64) -> (World, ShipState) {
        let mut rng = Pcg32::new(seed);
        (World::generate(&mut rng), ShipState::new(TIME_MAX))
    }

    #[test]
    fn test_shape_and_ranges() {
        let (world, ship) = fresh(11);
        let obs = Observation::encode(&world, &ship, TIME_MAX);
        assert_eq!(obs.len(), OBS_DIM);
        for (i, &v) in obs.values.iter().enumerate() {
            if (PRICE_DELTA_INDEX..INVENTORY_INDEX).contains(&i) {
                assert!((-1.0..=1.0).contains(&v), "index {i} = {v}");
            } else {
                assert!((0.0..=1.0).contains(&v), "index {i} = {v}");
            }
        }
    }

    #[test]
    fn test_station_start_block() {
        let (world, ship) = fresh(11);
        let obs = Observation::encode(&world, &ship, TIME_MAX);
        assert_eq!(obs.values[0], 1.0);
        assert_eq!(obs.values[1], 1.0);
        assert_eq!(obs.values[6], 1.0);
        assert_eq!(obs.values[7], 0.0);
        assert_eq!(obs.values[17], 1.0);
        assert_eq!(obs.values[18], 0.0);
        assert_eq!(&obs.values[19..22], &[1.0, 0.0, 0.0]);
        assert_eq!(obs.values[22], 0.0);
        assert_eq!(obs.values[23], 0.0);
        assert!((obs.values[14] - 3.0 / 12.0).abs() < 1e-6);
        // No asteroids at the station.
        assert!(obs.values[ASTEROID_BASE..PRICE_BASE_INDEX].iter().all(|&v| v == 0.0));
        // Price deltas start at zero.
        assert!(obs.values[PRICE_DELTA_INDEX..INVENTORY_INDEX].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_neighbor_blocks_match_world() {
        let (world, ship) = fresh(123);
        let obs = Observation::encode(&world, &ship, TIME_MAX);
        for slot in 0..MAX_NEIGHBORS {
            let base = NEIGHBOR_BASE + NEIGHBOR_STRIDE * slot;
            match world.edge(0, slot) {
                Some(edge) => {
                    assert_eq!(obs.values[base], 1.0);
                    let hot: f32 = obs.values[base + 1..base + 4].iter().sum();
                    assert_eq!(hot, 1.0);
                    assert!((obs.values[base + 4] - edge.travel_time as f32 / 8.0).abs() < 1e-6);
                    assert_eq!(obs.values[base + 6], 0.5);
                }
                None => assert!(obs.values[base..base + NEIGHBOR_STRIDE].iter().all(|&v| v == 0.0)),
            }
        }
    }

    #[test]
    fn test_asteroid_blocks_at_field_node() {
        let (world, mut ship) = fresh(123);
        ship.current_node = 1;
        ship.selected_asteroid = Some(2);
        let obs = Observation::encode(&world, &ship, TIME_MAX);

        assert_eq!(obs.values[17], 0.0);
        assert_eq!(obs.values[18], 1.0);
        assert_eq!(obs.selected_count(), 1);
        for a in 0..MAX_ASTEROIDS {
            let base = ASTEROID_BASE + ASTEROID_STRIDE * a;
            if world.asteroid(1, a).is_some() {
                let sum: f32 = obs.values[base + 1..base + 7].iter().sum();
                assert!((sum - 1.0).abs() < 1e-5);
                assert!((obs.values[base + 9] - 0.1).abs() < 1e-6);
            } else {
                assert_eq!(obs.values[base], 0.0);
            }
        }
    }

    #[test]
    fn test_encode_into_overwrites_stale_values() {
        let (world, ship) = fresh(4);
        let mut buf = vec![9.0f32; OBS_DIM];
        encode_into(&world, &ship, TIME_MAX, &mut buf);
        assert_eq!(buf, Observation::encode(&world, &ship, TIME_MAX).values);
    }
}
