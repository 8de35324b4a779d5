// src/world.rs
//
// Travel graph, asteroid fields and station market, plus the seeded generator.
//
// Storage is flat and fixed-size: `MAX_NODES` rows of neighbor slots and
// asteroid slots, with `None` marking an empty slot. Rows past `node_count`
// stay empty. The generator consumes the PRNG in a fixed order (node
// attributes, spanning tree, extra edges, asteroids, market), and that order
// is part of the replay contract.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::rng::Pcg32;

const TWO_PI: f32 = 2.0 * std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Station = 0,
    Cluster = 1,
    Hazard = 2,
}

impl NodeType {
    /// Position in the one-hot node-type encoding.
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_type: NodeType,
    /// Hazard intensity in [0, 1].
    pub hazard: f32,
    /// Pirate activity in [0, 1].
    pub pirate: f32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            node_type: NodeType::Cluster,
            hazard: 0.0,
            pirate: 0.0,
        }
    }
}

/// One directed half of an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSlot {
    pub to: u8,
    pub travel_time: u8,
    pub fuel_cost: f32,
    pub threat_true: f32,
    /// Agent-visible estimate; starts at the 0.5 prior.
    pub threat_est: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub true_comp: [f32; N_COMMODITIES],
    pub richness: f32,
    pub stability_true: f32,
    pub noise_profile: f32,
    /// 1.0 means exhausted or fractured.
    pub depletion: f32,
    pub comp_est: [f32; N_COMMODITIES],
    pub stability_est: f32,
    pub scan_conf: f32,
}

impl Asteroid {
    pub fn is_minable(&self) -> bool {
        self.depletion < 1.0
    }
}

/// Per-commodity market state at the station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommodityMarket {
    pub price: f32,
    pub prev_price: f32,
    pub phase: f32,
    pub period: f32,
    pub amplitude: f32,
    pub inventory: f32,
    pub recent_sales: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub commodities: [CommodityMarket; N_COMMODITIES],
}

impl Market {
    fn generate(rng: &mut Pcg32) -> Self {
        let mut commodities = [CommodityMarket {
            price: 0.0,
            prev_price: 0.0,
            phase: 0.0,
            period: 0.0,
            amplitude: 0.0,
            inventory: 0.0,
            recent_sales: 0.0,
        }; N_COMMODITIES];

        for (c, slot) in commodities.iter_mut().enumerate() {
            let inventory = rng.uniform(20.0, 120.0);
            let phase = rng.uniform(0.0, TWO_PI);
            let period = rng.uniform(180.0, 380.0);
            let amp_factor = rng.uniform(0.10, 0.30);
            let amplitude = PRICE_BASE[c] * amp_factor;
            let price = (PRICE_BASE[c] + amplitude * phase.sin()).clamp(PRICE_MIN[c], PRICE_MAX[c]);

            *slot = CommodityMarket {
                price,
                prev_price: price,
                phase,
                period,
                amplitude,
                inventory,
                recent_sales: 0.0,
            };
        }

        Self { commodities }
    }

    pub fn price(&self, commodity: usize) -> f32 {
        self.commodities[commodity].price
    }

    /// Cargo valued at current prices.
    pub fn cargo_value(&self, cargo: &[f32; N_COMMODITIES]) -> f32 {
        let mut value = 0.0f32;
        for (qty, m) in cargo.iter().zip(self.commodities.iter()) {
            value += qty * m.price;
        }
        value
    }
}

/// Everything generated at reset: graph, fields, market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub node_count: u8,
    pub nodes: Vec<Node>,
    pub neighbors: Vec<[Option<EdgeSlot>; MAX_NEIGHBORS]>,
    /// BFS hop count to node 0, capped at `MAX_NODE_INDEX`.
    pub steps_to_station: Vec<u8>,
    pub asteroids: Vec<[Option<Asteroid>; MAX_ASTEROIDS]>,
    pub market: Market,
}

impl World {
    /// Build a world from the generator's current position.
    pub fn generate(rng: &mut Pcg32) -> Self {
        let node_count = rng.integers(8, MAX_NODES as u32 + 1) as u8;

        let mut world = Self {
            node_count,
            nodes: vec![Node::default(); MAX_NODES],
            neighbors: vec![[None; MAX_NEIGHBORS]; MAX_NODES],
            steps_to_station: vec![MAX_NODE_INDEX; MAX_NODES],
            asteroids: vec![[None; MAX_ASTEROIDS]; MAX_NODES],
            market: Market {
                commodities: [CommodityMarket {
                    price: 0.0,
                    prev_price: 0.0,
                    phase: 0.0,
                    period: 0.0,
                    amplitude: 0.0,
                    inventory: 0.0,
                    recent_sales: 0.0,
                }; N_COMMODITIES],
            },
        };

        world.nodes[0].node_type = NodeType::Station;
        for node in world.nodes.iter_mut().take(node_count as usize).skip(1) {
            node.node_type = if rng.next_f32() < HAZARD_NODE_PROB {
                NodeType::Hazard
            } else {
                NodeType::Cluster
            };
            node.hazard = rng.uniform(0.05, 0.35);
            node.pirate = rng.uniform(0.05, 0.30);
            if node.node_type == NodeType::Hazard {
                node.hazard = (node.hazard + HAZARD_NODE_HAZARD_BOOST).min(1.0);
                node.pirate = (node.pirate + HAZARD_NODE_PIRATE_BOOST).min(1.0);
            }
        }

        // Spanning tree: every node hangs off an earlier one.
        for node in 1..node_count as u32 {
            let parent = rng.integers(0, node);
            world.add_edge(rng, node as usize, parent as usize);
        }

        for _ in 0..node_count {
            let u = rng.integers(0, node_count as u32) as usize;
            let v = rng.integers(0, node_count as u32) as usize;
            if u == v {
                continue;
            }
            world.add_edge(rng, u, v);
        }

        world.recompute_steps_to_station();
        world.generate_asteroids(rng);
        world.market = Market::generate(rng);
        world
    }

    pub fn is_station(&self, node: u8) -> bool {
        self.nodes[node as usize].node_type == NodeType::Station
    }

    pub fn edge(&self, node: u8, slot: usize) -> Option<&EdgeSlot> {
        self.neighbors[node as usize].get(slot)?.as_ref()
    }

    pub fn asteroid(&self, node: u8, index: usize) -> Option<&Asteroid> {
        self.asteroids[node as usize].get(index)?.as_ref()
    }

    pub fn asteroid_mut(&mut self, node: u8, index: usize) -> Option<&mut Asteroid> {
        self.asteroids[node as usize].get_mut(index)?.as_mut()
    }

    /// Hop count from `node` to the station.
    pub fn steps_to_station(&self, node: u8) -> u8 {
        if node >= self.node_count {
            return MAX_NODE_INDEX;
        }
        self.steps_to_station[node as usize]
    }

    fn edge_exists(&self, u: usize, v: usize) -> bool {
        self.neighbors[u]
            .iter()
            .any(|slot| matches!(slot, Some(e) if e.to as usize == v))
    }

    fn first_free_slot(&self, node: usize) -> Option<usize> {
        self.neighbors[node].iter().position(|slot| slot.is_none())
    }

    /// Insert a mirrored edge. Silently skips duplicates and full endpoints;
    /// nothing is drawn from the PRNG in that case.
    fn add_edge(&mut self, rng: &mut Pcg32, u: usize, v: usize) {
        let n = self.node_count as usize;
        if u >= n || v >= n || self.edge_exists(u, v) {
            return;
        }
        let (u_slot, v_slot) = match (self.first_free_slot(u), self.first_free_slot(v)) {
            (Some(a), Some(b)) => (a, b),
            _ => return,
        };

        let travel_time = rng.integers(1, TRAVEL_TIME_MAX as u32 + 1) as u8;
        let fuel_cost = rng.uniform(EDGE_FUEL_COST_MIN, TRAVEL_FUEL_COST_MAX * 0.7);
        let threat = 0.5 * (self.nodes[u].hazard + self.nodes[v].hazard)
            + 0.5 * (self.nodes[u].pirate + self.nodes[v].pirate)
            + rng.normal(0.0, EDGE_THREAT_NOISE);
        let threat = threat.clamp(0.0, 1.0);

        let half = |to: usize| EdgeSlot {
            to: to as u8,
            travel_time,
            fuel_cost,
            threat_true: threat,
            threat_est: THREAT_ESTIMATE_PRIOR,
        };
        self.neighbors[u][u_slot] = Some(half(v));
        self.neighbors[v][v_slot] = Some(half(u));
    }

    fn recompute_steps_to_station(&mut self) {
        self.steps_to_station = vec![MAX_NODE_INDEX; MAX_NODES];
        if self.node_count == 0 {
            return;
        }

        let mut visited = [false; MAX_NODES];
        let mut queue: Vec<usize> = Vec::with_capacity(MAX_NODES);
        visited[0] = true;
        self.steps_to_station[0] = 0;
        queue.push(0);

        let mut head = 0;
        while head < queue.len() {
            let cur = queue[head];
            head += 1;
            let next_dist = self.steps_to_station[cur].saturating_add(1).min(MAX_NODE_INDEX);

            for edge in self.neighbors[cur].iter().flatten() {
                let to = edge.to as usize;
                if to >= self.node_count as usize || visited[to] {
                    continue;
                }
                visited[to] = true;
                self.steps_to_station[to] = next_dist;
                queue.push(to);
            }
        }
    }

    fn generate_asteroids(&mut self, rng: &mut Pcg32) {
        for node in 0..self.node_count as usize {
            if self.nodes[node].node_type == NodeType::Station {
                continue;
            }

            let count = rng.integers(5, MAX_ASTEROIDS as u32 + 1) as usize;
            for slot in self.asteroids[node].iter_mut().take(count) {
                let true_comp = rng.dirichlet(&[1.0; N_COMMODITIES]);
                let richness = rng.lognormal(-0.2, 0.65).clamp(0.2, 4.0);
                let stability_true = rng.beta(3.0, 2.0);
                let noise_profile = rng.uniform(0.04, 0.22);
                let comp_est = rng.dirichlet(&[1.0; N_COMMODITIES]);

                *slot = Some(Asteroid {
                    true_comp,
                    richness,
                    stability_true,
                    noise_profile,
                    depletion: 0.0,
                    comp_est,
                    stability_est: 0.5,
                    scan_conf: 0.1,
                });
            }
        }
    }
}
