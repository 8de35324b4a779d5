// src/config.rs
//
// Engine tunables.
//
// Only two knobs are exposed at the engine boundary: the episode time budget
// and the invalid-action penalty. Every other number is part of the frozen
// contract in `constants`.
//
// Env overrides (each logged with a `[config]` line on stderr):
// - PROSPECTOR_TIME_MAX
// - PROSPECTOR_INVALID_ACTION_PENALTY

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INVALID_ACTION_PENALTY, TIME_MAX};

pub const ENV_TIME_MAX: &str = "PROSPECTOR_TIME_MAX";
pub const ENV_INVALID_ACTION_PENALTY: &str = "PROSPECTOR_INVALID_ACTION_PENALTY";

/// Construction-time configuration for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Episode time budget in ticks.
    pub time_max: f32,
    /// Reward deducted whenever an action is coerced to Hold.
    pub invalid_action_penalty: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_max: TIME_MAX,
            invalid_action_penalty: DEFAULT_INVALID_ACTION_PENALTY,
        }
    }
}

impl EngineConfig {
    /// Short episodes for tests and smoke runs.
    pub fn short(time_max: f32) -> Self {
        Self {
            time_max,
            ..Self::default()
        }
    }

    /// Defaults plus process environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are reported and ignored; the current value is kept.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIME_MAX) {
            match raw.trim().parse::<f32>() {
                Ok(v) => {
                    self.time_max = v;
                    eprintln!("[config] {ENV_TIME_MAX} = {v} (overrode default)");
                }
                Err(_) => {
                    eprintln!(
                        "[config] WARN: could not parse {} = {:?} as f32; using default {}",
                        ENV_TIME_MAX, raw, self.time_max
                    );
                }
            }
        }

        if let Some(raw) = lookup(ENV_INVALID_ACTION_PENALTY) {
            match raw.trim().parse::<f32>() {
                Ok(v) => {
                    self.invalid_action_penalty = v;
                    eprintln!("[config] {ENV_INVALID_ACTION_PENALTY} = {v} (overrode default)");
                }
                Err(_) => {
                    eprintln!(
                        "[config] WARN: could not parse {} = {:?} as f32; using default {}",
                        ENV_INVALID_ACTION_PENALTY, raw, self.invalid_action_penalty
                    );
                }
            }
        }

        self
    }

    /// Reject tunables that would make the episode meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("time_max", self.time_max)?;
        check_positive("invalid_action_penalty", self.invalid_action_penalty)?;
        Ok(())
    }

    /// Native-core semantics: any non-positive tunable silently falls back to its default.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            time_max: if self.time_max > 0.0 {
                self.time_max
            } else {
                defaults.time_max
            },
            invalid_action_penalty: if self.invalid_action_penalty > 0.0 {
                self.invalid_action_penalty
            } else {
                defaults.invalid_action_penalty
            },
        }
    }
}

fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

/// Errors raised when validating an [`EngineConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositive { field: &'static str, value: f32 },
    NonFinite { field: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive { field, value } => {
                write!(f, "config field '{}' must be positive, got {}", field, value)
            }
            ConfigError::NonFinite { field } => {
                write!(f, "config field '{}' must be finite", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.time_max, 20000.0);
        assert_eq!(cfg.invalid_action_penalty, 0.01);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overrides_apply() {
        let cfg = EngineConfig::default().with_overrides(lookup_from(&[
            (ENV_TIME_MAX, "500"),
            (ENV_INVALID_ACTION_PENALTY, " 0.25 "),
        ]));
        assert_eq!(cfg.time_max, 500.0);
        assert_eq!(cfg.invalid_action_penalty, 0.25);
    }

    #[test]
    fn test_unparseable_override_keeps_default() {
        let cfg = EngineConfig::default().with_overrides(lookup_from(&[(ENV_TIME_MAX, "lots")]));
        assert_eq!(cfg.time_max, TIME_MAX);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = EngineConfig {
            time_max: 0.0,
            invalid_action_penalty: 0.01,
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositive {
                field: "time_max",
                value: 0.0
            })
        );

        let cfg = EngineConfig {
            time_max: 100.0,
            invalid_action_penalty: f32::INFINITY,
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonFinite {
                field: "invalid_action_penalty"
            })
        );
    }

    #[test]
    fn test_sanitized_falls_back_per_field() {
        let cfg = EngineConfig {
            time_max: -5.0,
            invalid_action_penalty: 0.3,
        }
        .sanitized();
        assert_eq!(cfg.time_max, TIME_MAX);
        assert_eq!(cfg.invalid_action_penalty, 0.3);
    }
}
