// ABOUTME: Display helpers: countdown and delta formatting plus time-based EMA power smoothing
// ABOUTME: Output of this module is presentation only and never feeds segment tracking
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pacing_core::constants::smoothing::MAX_WINDOW_SECONDS;
use pacing_core::constants::time::{MS_PER_SECOND, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
use pacing_core::models::FinishPrediction;

/// Placeholder shown when a time is unknown
pub const UNKNOWN_COUNTDOWN: &str = "—:—";

fn split_hms(seconds: f64) -> (u64, u64, u64) {
    let hours = (seconds / SECONDS_PER_HOUR).floor() as u64;
    let minutes = ((seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE).floor() as u64;
    let secs = (seconds % SECONDS_PER_MINUTE).floor() as u64;
    (hours, minutes, secs)
}

/// Format seconds as `H:MM:SS` or `M:SS`; negative values show as zero
#[must_use]
pub fn format_countdown(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite()) else {
        return UNKNOWN_COUNTDOWN.to_owned();
    };
    let (hours, minutes, secs) = split_hms(seconds.max(0.0));
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Format a signed delta as `+M:SS` / `-M:SS`; unknown shows as `+0:00`
#[must_use]
pub fn format_delta_seconds(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return "+0:00".to_owned();
    };
    let sign = if value >= 0.0 { '+' } else { '-' };
    let abs = value.abs();
    let minutes = (abs / SECONDS_PER_MINUTE).floor() as u64;
    let seconds = (abs % SECONDS_PER_MINUTE).floor() as u64;
    format!("{sign}{minutes}:{seconds:02}")
}

/// Format a positive duration for tables; `None` when not positive
#[must_use]
pub fn format_duration(seconds: Option<f64>) -> Option<String> {
    seconds
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| format_countdown(Some(s)))
}

/// Remaining seconds counted down since the prediction was produced
#[must_use]
pub fn live_remaining_seconds(prediction: &FinishPrediction, now_ms: i64) -> f64 {
    let since = (now_ms - prediction.updated_at).max(0) as f64 / MS_PER_SECOND;
    (prediction.remaining_seconds - since).max(0.0)
}

/// Time-based exponential smoothing of displayed power
///
/// The time constant is the window; a zero window passes samples through.
/// Works with irregular sample rates because the blend factor depends on the
/// gap since the previous sample.
#[derive(Debug, Clone, Default)]
pub struct PowerSmoother {
    window_seconds: f64,
    ema: Option<f64>,
    last_ms: Option<i64>,
}

impl PowerSmoother {
    /// Create a smoother with the given window (normalised to 0..=5 s in 0.5 s steps)
    #[must_use]
    pub fn new(window_seconds: f64) -> Self {
        Self {
            window_seconds: normalize_window(window_seconds),
            ema: None,
            last_ms: None,
        }
    }

    /// Current window in seconds
    #[must_use]
    pub const fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Change the window
    pub fn set_window(&mut self, window_seconds: f64) {
        self.window_seconds = normalize_window(window_seconds);
    }

    /// Feed a sample and return the value to display
    pub fn sample(&mut self, now_ms: i64, power: Option<f64>) -> Option<f64> {
        let power = power.filter(|p| p.is_finite());
        if self.window_seconds <= 0.0 {
            if power.is_some() {
                self.ema = power;
            }
            self.last_ms = Some(now_ms);
            return power;
        }

        let (Some(ema), Some(last_ms)) = (self.ema, self.last_ms) else {
            if power.is_some() {
                self.ema = power;
            }
            self.last_ms = Some(now_ms);
            return self.ema;
        };

        let Some(power) = power else {
            return Some(ema);
        };

        let dt_ms = (now_ms - last_ms).max(0) as f64;
        let tau_ms = self.window_seconds * MS_PER_SECOND;
        let alpha = 1.0 - (-dt_ms / tau_ms).exp();
        let next = ema + alpha * (power - ema);
        self.ema = Some(next);
        self.last_ms = Some(now_ms);
        Some(next)
    }
}

/// Clamp to the supported range and snap to half seconds
#[must_use]
pub fn normalize_window(window_seconds: f64) -> f64 {
    if !window_seconds.is_finite() {
        return 0.0;
    }
    ((window_seconds * 2.0).round() / 2.0).clamp(0.0, MAX_WINDOW_SECONDS)
}
