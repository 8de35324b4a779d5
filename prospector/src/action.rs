// src/action.rs
//
// Typed view of the 69 discrete action codes.
//
// Code layout (frozen):
//   0-5    travel to neighbor slot k
//   6      hold
//   7      emergency burn
//   8-10   scan (wide / focused / deep)
//   11     threat listen
//   12-27  select asteroid (code - 12)
//   28-30  mine (conservative / standard / aggressive)
//   31     stabilize
//   32     refine
//   33     cooldown
//   34     maintenance
//   35     hull patch
//   36-41  jettison commodity (code - 36)
//   42     dock
//   43-60  sell commodity c at bucket b (code = 43 + 3c + b)
//   61-63  buy fuel (small / medium / large)
//   64-66  buy supply (repair kit / stabilizer / decoy)
//   67     overhaul
//   68     end run

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Code executed in place of an invalid action.
pub const HOLD_CODE: u8 = 6;

const SELECT_BASE: u8 = 12;
const JETTISON_BASE: u8 = 36;
const SELL_BASE: u8 = 43;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    Wide,
    Focused,
    Deep,
}

impl ScanMode {
    /// (blend toward the noisy truth, confidence gain, noise multiplier)
    pub fn update_params(self) -> (f32, f32, f32) {
        match self {
            ScanMode::Wide => (0.22, 0.10, 1.35),
            ScanMode::Focused => (0.42, 0.20, 1.0),
            ScanMode::Deep => (0.80, 0.45, 0.55),
        }
    }

    /// (dt, fuel, alert)
    pub fn cost(self) -> (u16, f32, f32) {
        match self {
            ScanMode::Wide => (WIDE_SCAN_TIME, WIDE_SCAN_FUEL, WIDE_SCAN_ALERT),
            ScanMode::Focused => (FOCUSED_SCAN_TIME, FOCUSED_SCAN_FUEL, FOCUSED_SCAN_ALERT),
            ScanMode::Deep => (DEEP_SCAN_TIME, DEEP_SCAN_FUEL, DEEP_SCAN_ALERT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiningMode {
    Conservative,
    Standard,
    Aggressive,
}

/// Per-mode mining parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningProfile {
    pub yield_mult: f32,
    pub heat_gain: f32,
    pub wear_gain: f32,
    pub alert_gain: f32,
    /// Sigma of the log-normal yield noise.
    pub noise_sigma: f32,
    pub fracture_bias: f32,
}

impl MiningMode {
    pub fn profile(self) -> MiningProfile {
        match self {
            MiningMode::Conservative => MiningProfile {
                yield_mult: 0.80,
                heat_gain: 2.0,
                wear_gain: 0.8,
                alert_gain: 1.2,
                noise_sigma: 0.05,
                fracture_bias: -0.7,
            },
            MiningMode::Standard => MiningProfile {
                yield_mult: 1.15,
                heat_gain: 4.0,
                wear_gain: 1.6,
                alert_gain: 2.2,
                noise_sigma: 0.10,
                fracture_bias: 0.0,
            },
            MiningMode::Aggressive => MiningProfile {
                yield_mult: 1.55,
                heat_gain: 7.0,
                wear_gain: 2.8,
                alert_gain: 4.0,
                noise_sigma: 0.16,
                fracture_bias: 0.8,
            },
        }
    }
}

/// Fraction of a cargo slot offered by a sell action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellBucket {
    Quarter,
    Half,
    All,
}

impl SellBucket {
    pub fn fraction(self) -> f32 {
        match self {
            SellBucket::Quarter => 0.25,
            SellBucket::Half => 0.50,
            SellBucket::All => 1.0,
        }
    }

    fn index(self) -> u8 {
        match self {
            SellBucket::Quarter => 0,
            SellBucket::Half => 1,
            SellBucket::All => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelPack {
    Small,
    Medium,
    Large,
}

impl FuelPack {
    /// (fuel added, credits charged)
    pub fn terms(self) -> (f32, f32) {
        match self {
            FuelPack::Small => (BUY_FUEL_SMALL_QTY, BUY_FUEL_SMALL_COST),
            FuelPack::Medium => (BUY_FUEL_MED_QTY, BUY_FUEL_MED_COST),
            FuelPack::Large => (BUY_FUEL_LARGE_QTY, BUY_FUEL_LARGE_COST),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Supply {
    RepairKit,
    Stabilizer,
    Decoy,
}

impl Supply {
    pub fn cost(self) -> f32 {
        match self {
            Supply::RepairKit => BUY_REPAIR_KIT_COST,
            Supply::Stabilizer => BUY_STABILIZER_COST,
            Supply::Decoy => BUY_DECOY_COST,
        }
    }

    pub fn cap(self) -> u8 {
        match self {
            Supply::RepairKit => REPAIR_KITS_CAP,
            Supply::Stabilizer => STABILIZERS_CAP,
            Supply::Decoy => DECOYS_CAP,
        }
    }
}

/// A decoded action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Travel { slot: u8 },
    Hold,
    EmergencyBurn,
    Scan(ScanMode),
    ThreatListen,
    Select { asteroid: u8 },
    Mine(MiningMode),
    Stabilize,
    Refine,
    Cooldown,
    Maintenance,
    HullPatch,
    Jettison { commodity: u8 },
    Dock,
    Sell { commodity: u8, bucket: SellBucket },
    BuyFuel(FuelPack),
    BuySupply(Supply),
    Overhaul,
    EndRun,
}

impl Action {
    /// Decode a raw code; `None` for codes outside 0..=68.
    pub fn decode(code: u8) -> Option<Action> {
        let action = match code {
            0..=5 => Action::Travel { slot: code },
            6 => Action::Hold,
            7 => Action::EmergencyBurn,
            8 => Action::Scan(ScanMode::Wide),
            9 => Action::Scan(ScanMode::Focused),
            10 => Action::Scan(ScanMode::Deep),
            11 => Action::ThreatListen,
            12..=27 => Action::Select {
                asteroid: code - SELECT_BASE,
            },
            28 => Action::Mine(MiningMode::Conservative),
            29 => Action::Mine(MiningMode::Standard),
            30 => Action::Mine(MiningMode::Aggressive),
            31 => Action::Stabilize,
            32 => Action::Refine,
            33 => Action::Cooldown,
            34 => Action::Maintenance,
            35 => Action::HullPatch,
            36..=41 => Action::Jettison {
                commodity: code - JETTISON_BASE,
            },
            42 => Action::Dock,
            43..=60 => {
                let offset = code - SELL_BASE;
                let bucket = match offset % 3 {
                    0 => SellBucket::Quarter,
                    1 => SellBucket::Half,
                    _ => SellBucket::All,
                };
                Action::Sell {
                    commodity: offset / 3,
                    bucket,
                }
            }
            61 => Action::BuyFuel(FuelPack::Small),
            62 => Action::BuyFuel(FuelPack::Medium),
            63 => Action::BuyFuel(FuelPack::Large),
            64 => Action::BuySupply(Supply::RepairKit),
            65 => Action::BuySupply(Supply::Stabilizer),
            66 => Action::BuySupply(Supply::Decoy),
            67 => Action::Overhaul,
            68 => Action::EndRun,
            _ => return None,
        };
        Some(action)
    }

    /// Inverse of [`Action::decode`].
    pub fn code(self) -> u8 {
        match self {
            Action::Travel { slot } => slot,
            Action::Hold => HOLD_CODE,
            Action::EmergencyBurn => 7,
            Action::Scan(ScanMode::Wide) => 8,
            Action::Scan(ScanMode::Focused) => 9,
            Action::Scan(ScanMode::Deep) => 10,
            Action::ThreatListen => 11,
            Action::Select { asteroid } => SELECT_BASE + asteroid,
            Action::Mine(MiningMode::Conservative) => 28,
            Action::Mine(MiningMode::Standard) => 29,
            Action::Mine(MiningMode::Aggressive) => 30,
            Action::Stabilize => 31,
            Action::Refine => 32,
            Action::Cooldown => 33,
            Action::Maintenance => 34,
            Action::HullPatch => 35,
            Action::Jettison { commodity } => JETTISON_BASE + commodity,
            Action::Dock => 42,
            Action::Sell { commodity, bucket } => SELL_BASE + commodity * 3 + bucket.index(),
            Action::BuyFuel(FuelPack::Small) => 61,
            Action::BuyFuel(FuelPack::Medium) => 62,
            Action::BuyFuel(FuelPack::Large) => 63,
            Action::BuySupply(Supply::RepairKit) => 64,
            Action::BuySupply(Supply::Stabilizer) => 65,
            Action::BuySupply(Supply::Decoy) => 66,
            Action::Overhaul => 67,
            Action::EndRun => 68,
        }
    }

    /// Scans carry a flat reward cost whether or not they succeed.
    pub fn is_scan(self) -> bool {
        matches!(self, Action::Scan(_))
    }

    /// Actions that are always invalid away from the station.
    pub fn requires_station(self) -> bool {
        matches!(
            self,
            Action::Dock
                | Action::Sell { .. }
                | Action::BuyFuel(_)
                | Action::BuySupply(_)
                | Action::Overhaul
        )
    }
}

/// Coerce an arbitrary integer into the `u8` code space.
///
/// Anything that does not fit in a byte maps to 69, which is always invalid.
pub fn coerce_code(raw: i64) -> u8 {
    u8::try_from(raw).unwrap_or(N_ACTIONS as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_decodes_and_reencodes() {
        for code in 0..N_ACTIONS as u8 {
            let action = Action::decode(code).expect("code in range");
            assert_eq!(action.code(), code, "code {} decoded to {:?}", code, action);
        }
    }

    #[test]
    fn test_out_of_range_codes_do_not_decode() {
        for code in [69u8, 70, 128, 200, 255] {
            assert!(Action::decode(code).is_none(), "code {} should be invalid", code);
        }
    }

    #[test]
    fn test_sell_layout() {
        assert_eq!(
            Action::decode(43),
            Some(Action::Sell {
                commodity: 0,
                bucket: SellBucket::Quarter
            })
        );
        assert_eq!(
            Action::decode(45),
            Some(Action::Sell {
                commodity: 0,
                bucket: SellBucket::All
            })
        );
        assert_eq!(
            Action::decode(60),
            Some(Action::Sell {
                commodity: 5,
                bucket: SellBucket::All
            })
        );
    }

    #[test]
    fn test_station_only_classification() {
        assert!(Action::decode(42).unwrap().requires_station());
        assert!(Action::decode(50).unwrap().requires_station());
        assert!(Action::decode(63).unwrap().requires_station());
        assert!(Action::decode(67).unwrap().requires_station());
        assert!(!Action::decode(36).unwrap().requires_station());
        assert!(!Action::decode(68).unwrap().requires_station());
    }

    #[test]
    fn test_coerce_code() {
        assert_eq!(coerce_code(12), 12);
        assert_eq!(coerce_code(255), 255);
        assert_eq!(coerce_code(-3), 69);
        assert_eq!(coerce_code(256), 69);
    }
}
