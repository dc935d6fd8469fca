// ABOUTME: Configurable pacing policy loaded from defaults and PACING_* environment variables
// ABOUTME: Defines PacingConfig, its validation rules, and the ConfigError variants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Pacing policy configuration.
//!
//! The thresholds here have no physical derivation; they are kept at their
//! established defaults and may be tuned per deployment.

use crate::constants::{bias, prediction, reconciliation, tracking, wbal};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Value outside acceptable range
    #[error("Invalid range: {0}")]
    InvalidRange(&'static str),

    /// Failed to parse configuration value
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Tunable pacing policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Plan/course mismatch below which only the final segment is shifted (km)
    pub tail_correction_threshold_km: f64,
    /// Minimum final segment length after tail correction (km)
    pub min_tail_segment_km: f64,
    /// Start-distance tolerance before a segment run is flagged partial (km)
    pub partial_start_tolerance_km: f64,
    /// Minimum planned seconds of finished, non-partial segments for a pacing ratio
    pub min_pacing_sample_seconds: f64,
    /// Pacing ratio lower clamp
    pub min_pacing_ratio: f64,
    /// Pacing ratio upper clamp
    pub max_pacing_ratio: f64,
    /// Prediction age that forces a recompute (seconds)
    pub prediction_stale_after_seconds: f64,
    /// W' used when the plan has none (joules)
    pub default_w_prime_j: f64,
    /// Manual offset clamp (metres, symmetric)
    pub manual_offset_limit_m: f64,
    /// Remaining distance that counts as finished (metres)
    pub event_complete_remaining_m: f64,
    /// Smallest power bias
    pub min_power_bias: f64,
    /// Largest power bias
    pub max_power_bias: f64,
    /// Integrated time required for cumulative averages (ms)
    pub min_average_time_ms: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            tail_correction_threshold_km: reconciliation::TAIL_CORRECTION_THRESHOLD_KM,
            min_tail_segment_km: reconciliation::MIN_TAIL_SEGMENT_KM,
            partial_start_tolerance_km: tracking::PARTIAL_START_TOLERANCE_KM,
            min_pacing_sample_seconds: prediction::MIN_PACING_SAMPLE_SECONDS,
            min_pacing_ratio: prediction::MIN_PACING_RATIO,
            max_pacing_ratio: prediction::MAX_PACING_RATIO,
            prediction_stale_after_seconds: prediction::STALE_AFTER_SECONDS,
            default_w_prime_j: wbal::DEFAULT_W_PRIME_J,
            manual_offset_limit_m: reconciliation::MANUAL_OFFSET_LIMIT_M,
            event_complete_remaining_m: reconciliation::EVENT_COMPLETE_REMAINING_M,
            min_power_bias: bias::MIN_POWER_BIAS,
            max_power_bias: bias::MAX_POWER_BIAS,
            min_average_time_ms: tracking::MIN_AVERAGE_TIME_MS,
        }
    }
}

/// Global configuration singleton
static PACING_CONFIG: OnceLock<PacingConfig> = OnceLock::new();

impl PacingConfig {
    /// Get the global configuration instance
    pub fn global() -> &'static Self {
        PACING_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                tracing::warn!("Failed to load pacing config: {e}, using defaults");
                Self::default()
            })
        })
    }

    /// Load configuration from defaults plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is unparseable or validation fails
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::default().apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRange` naming the first violated rule
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tail_correction_threshold_km <= 0.0 {
            return Err(ConfigError::InvalidRange(
                "tail_correction_threshold_km must be > 0",
            ));
        }
        if self.min_tail_segment_km <= 0.0 {
            return Err(ConfigError::InvalidRange("min_tail_segment_km must be > 0"));
        }
        if self.partial_start_tolerance_km < 0.0 {
            return Err(ConfigError::InvalidRange(
                "partial_start_tolerance_km must be >= 0",
            ));
        }
        if self.min_pacing_sample_seconds < 0.0 {
            return Err(ConfigError::InvalidRange(
                "min_pacing_sample_seconds must be >= 0",
            ));
        }
        if self.min_pacing_ratio <= 0.0 || self.min_pacing_ratio >= self.max_pacing_ratio {
            return Err(ConfigError::InvalidRange(
                "pacing ratio bounds must satisfy 0 < min < max",
            ));
        }
        if self.prediction_stale_after_seconds <= 0.0 {
            return Err(ConfigError::InvalidRange(
                "prediction_stale_after_seconds must be > 0",
            ));
        }
        if self.default_w_prime_j <= 0.0 {
            return Err(ConfigError::InvalidRange("default_w_prime_j must be > 0"));
        }
        if self.manual_offset_limit_m < 0.0 {
            return Err(ConfigError::InvalidRange(
                "manual_offset_limit_m must be >= 0",
            ));
        }
        if self.min_power_bias <= 0.0 || self.min_power_bias > self.max_power_bias {
            return Err(ConfigError::InvalidRange(
                "power bias bounds must satisfy 0 < min <= max",
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        override_from_env(
            "PACING_TAIL_CORRECTION_THRESHOLD_KM",
            &mut self.tail_correction_threshold_km,
        )?;
        override_from_env("PACING_MIN_TAIL_SEGMENT_KM", &mut self.min_tail_segment_km)?;
        override_from_env(
            "PACING_PARTIAL_START_TOLERANCE_KM",
            &mut self.partial_start_tolerance_km,
        )?;
        override_from_env(
            "PACING_MIN_PACING_SAMPLE_SECONDS",
            &mut self.min_pacing_sample_seconds,
        )?;
        override_from_env("PACING_MIN_PACING_RATIO", &mut self.min_pacing_ratio)?;
        override_from_env("PACING_MAX_PACING_RATIO", &mut self.max_pacing_ratio)?;
        override_from_env(
            "PACING_PREDICTION_STALE_SECONDS",
            &mut self.prediction_stale_after_seconds,
        )?;
        override_from_env("PACING_DEFAULT_W_PRIME_J", &mut self.default_w_prime_j)?;
        override_from_env(
            "PACING_MANUAL_OFFSET_LIMIT_M",
            &mut self.manual_offset_limit_m,
        )?;
        override_from_env(
            "PACING_EVENT_COMPLETE_REMAINING_M",
            &mut self.event_complete_remaining_m,
        )?;
        override_from_env("PACING_MIN_POWER_BIAS", &mut self.min_power_bias)?;
        override_from_env("PACING_MAX_POWER_BIAS", &mut self.max_power_bias)?;
        override_from_env("PACING_MIN_AVERAGE_TIME_MS", &mut self.min_average_time_ms)?;
        Ok(self)
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(val) = env::var(key) {
        *target = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse(format!("Invalid {key}: {val}")))?;
    }
    Ok(())
}
