// ABOUTME: Host-facing bridge commands controlling the pacer: plan, offset, home athlete and power bias
// ABOUTME: Commands are serde-tagged JSON messages applied to the engine, returning what to persist and share
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use pacing_core::errors::{AppError, AppResult};
use pacing_core::models::{normalize_id, Plan};
use pacing_engine::bias::BiasDirection;
use pacing_engine::{LoadedPlan, PacingEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::sync::{strip_heavy_fields, SharedStatePatch};

/// Command sent by a host page or controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeCommand {
    /// Load a plan document
    #[serde(rename = "tt-plan:set")]
    SetPlan {
        /// Plan JSON; route geometry is discarded
        plan: Value,
    },
    /// Drop the plan
    #[serde(rename = "tt-plan:clear")]
    ClearPlan,
    /// Set the manual distance offset
    #[serde(rename = "set-offset")]
    SetOffset {
        /// Offset in metres
        meters: f64,
        /// Clamp to the configured limit
        #[serde(default)]
        clamp: bool,
    },
    /// Lock the home athlete to the rider currently shown
    #[serde(rename = "lock-home")]
    LockHome,
    /// Set the home athlete explicitly
    #[serde(rename = "set-home-athlete", rename_all = "camelCase")]
    SetHomeAthlete {
        /// Athlete id as string or number; `null` clears
        #[serde(default)]
        athlete_id: Value,
    },
    /// Forget the home athlete
    #[serde(rename = "clear-home-athlete")]
    ClearHomeAthlete,
    /// Set the power bias multiplier
    #[serde(rename = "set-power-bias")]
    SetPowerBias {
        /// Multiplier, clamped to the configured range
        bias: f64,
    },
    /// Step the power bias by one notch
    #[serde(rename = "adjust-power-bias")]
    AdjustPowerBias {
        /// `up` or `down`
        direction: BiasDirection,
    },
    /// Clear all segment tracking
    #[serde(rename = "reset-tracking")]
    ResetTracking,
}

/// Side effects a command asks the session to carry out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeEffect {
    /// Engine state changed
    pub changed: bool,
    /// Persisted state must be saved
    pub persist: bool,
    /// Patch to broadcast to other instances
    pub patch: SharedStatePatch,
}

impl BridgeEffect {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Read an athlete id sent as string or number
fn athlete_id_from(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => normalize_id(text),
        Value::Number(number) => normalize_id(&number.to_string()),
        _ => None,
    }
}

impl BridgeCommand {
    /// Decode a command from JSON
    ///
    /// # Errors
    ///
    /// Returns an error for unknown command types or malformed fields
    pub fn from_json(text: &str) -> AppResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::invalid_format(format!("bridge command: {e}")).with_source(e))
    }

    /// Apply the command to `engine`
    ///
    /// # Errors
    ///
    /// Returns an error if a plan document cannot be decoded
    pub fn apply(self, engine: &mut PacingEngine, now: DateTime<Utc>) -> AppResult<BridgeEffect> {
        let effect = match self {
            Self::SetPlan { plan } => {
                let plan: Plan = serde_json::from_value(strip_heavy_fields(&plan))
                    .map_err(|e| AppError::invalid_format(format!("plan: {e}")).with_source(e))?;
                engine.set_plan(plan, true, now);
                info!("Plan received from host");
                let mut patch = SharedStatePatch::with_plan(engine.plan().map(LoadedPlan::plan))?;
                patch.power_bias = Some(engine.power_bias().value());
                patch.clear_stats_timestamp = Some(now.timestamp_millis());
                BridgeEffect {
                    changed: true,
                    persist: true,
                    patch,
                }
            }
            Self::ClearPlan => {
                engine.clear_plan(true, now);
                info!("Plan cleared by host");
                BridgeEffect {
                    changed: true,
                    persist: true,
                    patch: SharedStatePatch {
                        plan: Some(None),
                        clear_stats_timestamp: Some(now.timestamp_millis()),
                        ..SharedStatePatch::default()
                    },
                }
            }
            Self::SetOffset { meters, clamp } => {
                if !meters.is_finite() {
                    return Err(AppError::invalid_input("offset must be finite"));
                }
                let changed = engine.set_manual_offset(meters, clamp);
                Self::offset_effect(engine, changed)
            }
            Self::LockHome => {
                let before = engine.home_athlete_id().map(str::to_owned);
                match engine.lock_home_to_current() {
                    Some(athlete) => {
                        info!(athlete_id = %athlete, "Home rider locked");
                        Self::home_effect(engine, before.as_deref() != Some(athlete.as_str()))
                    }
                    None => BridgeEffect::unchanged(),
                }
            }
            Self::SetHomeAthlete { athlete_id } => {
                let athlete = athlete_id_from(&athlete_id);
                let changed = engine.set_home_athlete(athlete.as_deref());
                Self::home_effect(engine, changed)
            }
            Self::ClearHomeAthlete => {
                let changed = engine.clear_home_athlete();
                Self::home_effect(engine, changed)
            }
            Self::SetPowerBias { bias } => {
                let changed = engine.set_power_bias(bias);
                Self::bias_effect(engine, changed)
            }
            Self::AdjustPowerBias { direction } => {
                let changed = engine.adjust_power_bias(direction);
                Self::bias_effect(engine, changed)
            }
            Self::ResetTracking => {
                engine.reset_tracking(now);
                BridgeEffect {
                    changed: true,
                    persist: false,
                    patch: SharedStatePatch {
                        clear_stats_timestamp: Some(now.timestamp_millis()),
                        ..SharedStatePatch::default()
                    },
                }
            }
        };
        Ok(effect)
    }

    fn offset_effect(engine: &PacingEngine, changed: bool) -> BridgeEffect {
        if !changed {
            return BridgeEffect::unchanged();
        }
        BridgeEffect {
            changed,
            persist: true,
            patch: SharedStatePatch {
                distance_offset: Some(engine.reconciliation().manual_offset_m),
                ..SharedStatePatch::default()
            },
        }
    }

    fn home_effect(engine: &PacingEngine, changed: bool) -> BridgeEffect {
        if !changed {
            return BridgeEffect::unchanged();
        }
        BridgeEffect {
            changed,
            persist: true,
            patch: SharedStatePatch {
                home_athlete_id: Some(engine.home_athlete_id().map(str::to_owned)),
                ..SharedStatePatch::default()
            },
        }
    }

    fn bias_effect(engine: &PacingEngine, changed: bool) -> BridgeEffect {
        if !changed {
            return BridgeEffect::unchanged();
        }
        BridgeEffect {
            changed,
            persist: true,
            patch: SharedStatePatch {
                power_bias: Some(engine.power_bias().value()),
                ..SharedStatePatch::default()
            },
        }
    }
}
