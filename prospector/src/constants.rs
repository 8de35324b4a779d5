// src/constants.rs
//
// Frozen numeric contract for the prospector engine.
//
// Shared with the accelerated build and with policies trained against the
// observation layout. Changing any value breaks replay parity.

// ----- Interface contract -----

/// Length of the observation vector.
pub const OBS_DIM: usize = 260;
/// Number of discrete action codes (0..=68).
pub const N_ACTIONS: usize = 69;

/// PCG32 stream selector used for every episode.
pub const RNG_STREAM: u64 = 54;

// ----- World dimensions -----

pub const N_COMMODITIES: usize = 6;
pub const MAX_NODES: usize = 32;
pub const MAX_NEIGHBORS: usize = 6;
pub const MAX_ASTEROIDS: usize = 16;
pub const NODE_TYPES: usize = 3;

/// Largest node index, also the cap for hop counts to the station.
pub const MAX_NODE_INDEX: u8 = (MAX_NODES - 1) as u8;

// ----- Gauge maxima -----

pub const CREDIT_SCALE: f32 = 1000.0;
pub const FUEL_MAX: f32 = 1000.0;
pub const HULL_MAX: f32 = 100.0;
pub const HEAT_MAX: f32 = 100.0;
pub const TOOL_MAX: f32 = 100.0;
pub const CARGO_MAX: f32 = 200.0;
pub const ALERT_MAX: f32 = 100.0;
pub const TIME_MAX: f32 = 20000.0;
pub const CREDITS_CAP: f32 = 10_000_000.0;

pub const REPAIR_KITS_CAP: u8 = 12;
pub const STABILIZERS_CAP: u8 = 12;
pub const DECOYS_CAP: u8 = 12;

// ----- Initial loadout -----

pub const INITIAL_REPAIR_KITS: u8 = 3;
pub const INITIAL_STABILIZERS: u8 = 2;
pub const INITIAL_DECOYS: u8 = 1;

// ----- Travel graph -----

pub const TRAVEL_TIME_MAX: f32 = 8.0;
pub const TRAVEL_FUEL_COST_MAX: f32 = 160.0;
pub const EDGE_FUEL_COST_MIN: f32 = 20.0;
pub const HAZARD_NODE_PROB: f32 = 0.25;
pub const HAZARD_NODE_HAZARD_BOOST: f32 = 0.25;
pub const HAZARD_NODE_PIRATE_BOOST: f32 = 0.12;
pub const EDGE_THREAT_NOISE: f32 = 0.05;
pub const THREAT_ESTIMATE_PRIOR: f32 = 0.5;
pub const THREAT_LISTEN_NOISE: f32 = 0.08;

// ----- Market -----

pub const PRICE_BASE: [f32; N_COMMODITIES] = [45.0, 55.0, 85.0, 145.0, 210.0, 120.0];
pub const PRICE_MIN: [f32; N_COMMODITIES] = [12.0, 15.0, 20.0, 50.0, 80.0, 30.0];
pub const PRICE_MAX: [f32; N_COMMODITIES] = [180.0, 200.0, 240.0, 320.0, 420.0, 300.0];
pub const INV_PRICE_BASE: [f32; N_COMMODITIES] = [
    1.0 / 45.0,
    1.0 / 55.0,
    1.0 / 85.0,
    1.0 / 145.0,
    1.0 / 210.0,
    1.0 / 120.0,
];
pub const PRICE_SCALE: f32 = 100.0;
pub const STATION_INVENTORY_NORM_CAP: f32 = 500.0;

pub const SLIPPAGE_K: f32 = 0.25;
pub const SLIPPAGE_ROOT: f32 = 0.2;
pub const SLIPPAGE_MAX: f32 = 0.70;

pub const INVENTORY_PRESSURE_K: f32 = 0.04;
pub const SALES_PRESSURE_K: f32 = 0.05;
pub const MARKET_NOISE_K: f32 = 0.03;
pub const SALES_DECAY_TAU: f32 = 14.0;
pub const INVENTORY_DECAY: f32 = 0.998;

// ----- Action durations (ticks) -----

pub const WIDE_SCAN_TIME: u16 = 3;
pub const FOCUSED_SCAN_TIME: u16 = 2;
pub const DEEP_SCAN_TIME: u16 = 4;
pub const THREAT_LISTEN_TIME: u16 = 2;
pub const STABILIZE_TIME: u16 = 2;
pub const REFINE_TIME: u16 = 2;
pub const COOLDOWN_TIME: u16 = 2;
pub const MAINT_TIME: u16 = 2;
pub const PATCH_TIME: u16 = 2;
pub const DOCK_TIME: u16 = 1;
pub const OVERHAUL_TIME: u16 = 3;

// ----- Action costs -----

pub const WIDE_SCAN_FUEL: f32 = 5.0;
pub const FOCUSED_SCAN_FUEL: f32 = 4.0;
pub const DEEP_SCAN_FUEL: f32 = 8.0;
pub const REFINE_FUEL: f32 = 4.0;
pub const COOLDOWN_FUEL: f32 = 2.0;
pub const EMERGENCY_BURN_FUEL: f32 = 18.0;

pub const REFINE_HEAT: f32 = 6.0;
pub const COOLDOWN_AMOUNT: f32 = 20.0;

pub const EMERGENCY_BURN_ALERT: f32 = 10.0;
pub const WIDE_SCAN_ALERT: f32 = 4.0;
pub const FOCUSED_SCAN_ALERT: f32 = 3.0;
pub const DEEP_SCAN_ALERT: f32 = 6.0;
pub const REFINE_ALERT: f32 = 3.0;
pub const COOLDOWN_ALERT: f32 = 1.0;
pub const ALERT_DECAY_HOLD: f32 = 3.0;
pub const DOCK_ALERT_DROP: f32 = 20.0;
pub const JETTISON_ALERT_RELIEF: f32 = 8.0;

pub const TOOL_REPAIR_AMOUNT: f32 = 25.0;
pub const HULL_PATCH_AMOUNT: f32 = 20.0;

pub const ESCAPE_BUFF_TICKS: u16 = 4;
pub const STABILIZE_BUFF_TICKS: u16 = 6;

/// Share of combined commodity 0+1 cargo consumed by one refine.
pub const REFINE_INPUT_FRAC: f32 = 0.15;
/// Output (commodity 4) per unit of refine input.
pub const REFINE_YIELD: f32 = 0.65;

// ----- Passive dynamics -----

pub const HEAT_DISSIPATION_PER_TICK: f32 = 2.5;
pub const OVERHEAT_DAMAGE_PER_UNIT: f32 = 1.25;

pub const HAZARD_DAMAGE_PER_TICK: f32 = 0.7;
pub const HAZARD_HEAT_PER_TICK: f32 = 0.5;
pub const HAZARD_ALERT_PER_TICK: f32 = 0.8;

pub const PIRATE_BIAS: f32 = -4.0;
pub const PIRATE_INTENSITY_W: f32 = 3.0;
pub const PIRATE_ALERT_W: f32 = 2.2;
pub const PIRATE_CARGO_W: f32 = 0.8;
pub const PIRATE_ESCAPE_W: f32 = 2.8;
pub const PIRATE_ALERT_GAIN: f32 = 8.0;
pub const DECOY_ABSORB_PROB: f32 = 0.6;
pub const DECOY_LOSS_MULT: f32 = 0.3;

// ----- Mining -----

pub const FRACTURE_DEPLETION_RATE: f32 = 0.01;
pub const FRACTURE_HULL_DAMAGE: f32 = 12.0;
pub const FRACTURE_HAZARD_GAIN: f32 = 0.1;
pub const HEAT_EFFICIENCY_KNEE: f32 = 0.7;

// ----- Station trade -----

pub const BUY_FUEL_SMALL_QTY: f32 = 120.0;
pub const BUY_FUEL_MED_QTY: f32 = 260.0;
pub const BUY_FUEL_LARGE_QTY: f32 = 480.0;

pub const BUY_FUEL_SMALL_COST: f32 = 60.0;
pub const BUY_FUEL_MED_COST: f32 = 120.0;
pub const BUY_FUEL_LARGE_COST: f32 = 210.0;
pub const BUY_REPAIR_KIT_COST: f32 = 150.0;
pub const BUY_STABILIZER_COST: f32 = 175.0;
pub const BUY_DECOY_COST: f32 = 110.0;

pub const OVERHAUL_COST: f32 = 280.0;

// ----- Reward coefficients -----

pub const REWARD_ALPHA_EXTRACT: f32 = 0.02;
pub const REWARD_BETA_FUEL: f32 = 0.10;
pub const REWARD_GAMMA_TIME: f32 = 0.001;
pub const REWARD_DELTA_WEAR: f32 = 0.05;
pub const REWARD_EPSILON_HEAT: f32 = 0.20;
pub const REWARD_ZETA_DAMAGE: f32 = 1.00;
pub const REWARD_KAPPA_PIRATE: f32 = 1.00;
pub const REWARD_SCAN_COST: f32 = 0.005;
pub const REWARD_HEAT_SAFE_FRAC: f32 = 0.70;
pub const REWARD_STRANDED_PEN: f32 = 50.0;
pub const REWARD_DESTROYED_PEN: f32 = 100.0;
pub const REWARD_TERMINAL_BONUS_B: f32 = 0.002;

pub const DEFAULT_INVALID_ACTION_PENALTY: f32 = 0.01;
