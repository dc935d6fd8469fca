// ABOUTME: Power bias multiplier applied to targets of segments not yet finished
// ABOUTME: Clamped to a configured range and adjusted in fixed steps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::config::PacingConfig;
use pacing_core::constants::bias::{ACTIVE_EPSILON, POWER_BIAS_STEP};
use serde::{Deserialize, Serialize};

use crate::tracking::SegmentRun;

/// Direction of a bias step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasDirection {
    /// Raise targets
    Up,
    /// Lower targets
    Down,
}

/// Multiplier on plan target power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerBias(f64);

impl Default for PowerBias {
    fn default() -> Self {
        Self(1.0)
    }
}

impl PowerBias {
    /// Clamp `value` into the configured range; non-finite or non-positive means neutral
    #[must_use]
    pub fn new(value: f64, config: &PacingConfig) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self::default();
        }
        Self(value.clamp(config.min_power_bias, config.max_power_bias))
    }

    /// Raw multiplier
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Move one step, staying inside the range
    #[must_use]
    pub fn step(self, direction: BiasDirection, config: &PacingConfig) -> Self {
        let delta = match direction {
            BiasDirection::Up => POWER_BIAS_STEP,
            BiasDirection::Down => -POWER_BIAS_STEP,
        };
        // keep two decimals so repeated steps do not drift
        Self::new(((self.0 + delta) * 100.0).round() / 100.0, config)
    }

    /// Whether the multiplier differs from neutral
    #[must_use]
    pub fn is_active(self) -> bool {
        (self.0 - 1.0).abs() > ACTIVE_EPSILON
    }

    /// Whether the bias applies to a segment with the given run
    #[must_use]
    pub fn applies_to(self, run: Option<&SegmentRun>) -> bool {
        self.is_active() && !run.is_some_and(|run| run.finished)
    }

    /// Target power for a segment after bias
    #[must_use]
    pub fn target(self, plan_power: Option<f64>, run: Option<&SegmentRun>) -> Option<f64> {
        let power = plan_power.filter(|p| p.is_finite())?;
        Some(if self.applies_to(run) {
            power * self.0
        } else {
            power
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_clamps_and_steps() {
        let config = PacingConfig::default();
        assert!((PowerBias::new(2.0, &config).value() - 1.3).abs() < f64::EPSILON);
        assert!((PowerBias::new(f64::NAN, &config).value() - 1.0).abs() < f64::EPSILON);
        let up = PowerBias::default().step(BiasDirection::Up, &config);
        assert!((up.value() - 1.01).abs() < 1e-9);
        assert!(up.is_active());
    }

    #[test]
    fn test_finished_segments_keep_plan_target() {
        let config = PacingConfig::default();
        let bias = PowerBias::new(1.1, &config);
        let mut run = SegmentRun::begin(0, false);
        assert!((bias.target(Some(200.0), Some(&run)).unwrap() - 220.0).abs() < 1e-9);
        run.finished = true;
        assert_eq!(bias.target(Some(200.0), Some(&run)), Some(200.0));
        assert_eq!(bias.target(None, None), None);
    }
}
