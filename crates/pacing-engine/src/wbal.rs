// ABOUTME: W' balance (anaerobic energy reserve) depletion and recovery model
// ABOUTME: Linear depletion above critical power, exponential recovery below it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # W' Balance
//!
//! Continuous-time reserve model with critical power `CP` and capacity `W'`:
//!
//! - `P > CP`: `reserve -= (P - CP) * dt`
//! - `P <= CP`: `reserve = W' - (W' - reserve) * exp(-(CP - P) * dt / W')`
//!
//! The reserve is clamped to `[-W', W']` after every step. Negative values
//! are kept for display continuity when the rider is over the limit.

use pacing_core::constants::time::MS_PER_SECOND;
use pacing_core::constants::wbal::{MAX_PERCENT, MIN_PERCENT};
use serde::{Deserialize, Serialize};

/// Advance a reserve by `dt_seconds` at constant `power`
#[must_use]
pub fn step_reserve(reserve: f64, power: f64, cp: f64, w_prime: f64, dt_seconds: f64) -> f64 {
    let next = if power > cp {
        reserve - (power - cp) * dt_seconds
    } else {
        w_prime - (w_prime - reserve) * (-(cp - power) * dt_seconds / w_prime).exp()
    };
    next.clamp(-w_prime, w_prime)
}

/// Reserve as a percentage of capacity, clamped to the display range
#[must_use]
pub fn reserve_percent(reserve: f64, w_prime: f64) -> Option<f64> {
    (w_prime.is_finite() && w_prime > 0.0 && reserve.is_finite())
        .then(|| (reserve / w_prime * 100.0).clamp(MIN_PERCENT, MAX_PERCENT))
}

/// Live W' balance state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WBalanceModel {
    /// Current reserve (joules)
    pub value: Option<f64>,
    /// Reserve as percent of capacity
    pub percent: Option<f64>,
    /// Critical power the state was initialised with
    pub cp: Option<f64>,
    /// Capacity the state was initialised with
    pub w_prime: Option<f64>,
    last_update_ms: Option<i64>,
}

impl WBalanceModel {
    /// Fresh, uninitialised model
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Integrate one sample
    ///
    /// Without a positive critical power the model resets. A change of CP or
    /// W' refills the reserve. Missing power only moves the time reference.
    pub fn update(&mut self, now_ms: i64, power: Option<f64>, cp: Option<f64>, w_prime: f64) {
        let Some(cp) = cp.filter(|cp| cp.is_finite() && *cp > 0.0) else {
            self.reset();
            return;
        };
        if !(w_prime.is_finite() && w_prime > 0.0) {
            self.reset();
            return;
        }

        let changed = self.cp != Some(cp) || self.w_prime != Some(w_prime);
        let Some(reserve) = self.value.filter(|_| !changed) else {
            self.cp = Some(cp);
            self.w_prime = Some(w_prime);
            self.value = Some(w_prime);
            self.percent = reserve_percent(w_prime, w_prime);
            self.last_update_ms = Some(now_ms);
            return;
        };

        let Some(power) = power.filter(|p| p.is_finite()) else {
            self.last_update_ms = Some(now_ms);
            self.percent = reserve_percent(reserve, w_prime);
            return;
        };

        let last = self.last_update_ms.unwrap_or(now_ms);
        self.last_update_ms = Some(now_ms);
        let dt_seconds = (now_ms - last) as f64 / MS_PER_SECOND;
        if dt_seconds <= 0.0 {
            return;
        }

        let next = step_reserve(reserve, power, cp, w_prime, dt_seconds);
        self.value = Some(next);
        self.percent = reserve_percent(next, w_prime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depletion_is_linear_above_cp() {
        let next = step_reserve(20_000.0, 350.0, 250.0, 20_000.0, 10.0);
        assert!((next - 19_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_reserve_never_leaves_bounds() {
        let mut reserve = 20_000.0;
        for _ in 0..1000 {
            reserve = step_reserve(reserve, 1500.0, 250.0, 20_000.0, 5.0);
            assert!((-20_000.0..=20_000.0).contains(&reserve));
        }
        assert!((reserve + 20_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_recovery_approaches_capacity_from_below() {
        let w_prime = 20_000.0;
        let mut reserve = 2_000.0;
        for _ in 0..600 {
            let next = step_reserve(reserve, 0.0, 250.0, w_prime, 5.0);
            assert!(next >= reserve);
            assert!(next <= w_prime);
            reserve = next;
        }
        assert!(w_prime - reserve < 1e-6);

        let at_cp = step_reserve(10_000.0, 250.0, 250.0, w_prime, 60.0);
        assert!((at_cp - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_refills_on_cp_change() {
        let mut model = WBalanceModel::new();
        model.update(0, Some(400.0), Some(250.0), 20_000.0);
        model.update(10_000, Some(400.0), Some(250.0), 20_000.0);
        assert!((model.value.unwrap() - 18_500.0).abs() < 1e-9);
        model.update(11_000, Some(400.0), Some(260.0), 20_000.0);
        assert_eq!(model.value, Some(20_000.0));
        assert_eq!(model.percent, Some(100.0));
        model.update(12_000, Some(400.0), None, 20_000.0);
        assert_eq!(model.value, None);
    }
}
