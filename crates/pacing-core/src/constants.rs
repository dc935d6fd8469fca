// ABOUTME: Pacing constants organized by concern (reconciliation, tracking, prediction, W'bal)
// ABOUTME: Default values for the configurable pacing policy and fixed numeric limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Application constants organized by domain.
//!
//! Values that are policy rather than physics are also exposed through
//! `PacingConfig` so deployments can tune them; the constants here are the
//! defaults that config starts from.

/// Distance reconciliation between plan space and course space
pub mod reconciliation {
    /// Plan/course mismatch below which only the final segment is shifted
    pub const TAIL_CORRECTION_THRESHOLD_KM: f64 = 1.0;

    /// Minimum length the final segment keeps after a tail correction (10 m)
    pub const MIN_TAIL_SEGMENT_KM: f64 = 0.01;

    /// Manual distance offset limit in metres (applied symmetrically)
    pub const MANUAL_OFFSET_LIMIT_M: f64 = 500.0;

    /// Remaining distance at or below which the event counts as finished
    pub const EVENT_COMPLETE_REMAINING_M: f64 = 0.5;
}

/// Segment tracking
pub mod tracking {
    /// Distance from a segment's nominal start beyond which a run is partial
    pub const PARTIAL_START_TOLERANCE_KM: f64 = 0.02;

    /// Integrated time required before cumulative averages are reported
    pub const MIN_AVERAGE_TIME_MS: f64 = 10_000.0;

    /// Minimum interval between identical interval-average broadcasts
    pub const INTERVAL_AVG_REBROADCAST_MS: i64 = 700;
}

/// Finish prediction
pub mod prediction {
    /// Minimum planned seconds of fully tracked segments before pacing counts
    pub const MIN_PACING_SAMPLE_SECONDS: f64 = 60.0;

    /// Lower clamp for the pacing ratio
    pub const MIN_PACING_RATIO: f64 = 0.25;

    /// Upper clamp for the pacing ratio
    pub const MAX_PACING_RATIO: f64 = 4.0;

    /// Age after which a prediction is recomputed even without a segment change
    pub const STALE_AFTER_SECONDS: f64 = 5.0;
}

/// Energy reserve (W'bal) model
pub mod wbal {
    /// Capacity used when the plan carries no W'
    pub const DEFAULT_W_PRIME_J: f64 = 20_000.0;

    /// Lower clamp of the displayed reserve percentage
    pub const MIN_PERCENT: f64 = -100.0;

    /// Upper clamp of the displayed reserve percentage
    pub const MAX_PERCENT: f64 = 200.0;

    /// Joules per kilojoule
    pub const JOULES_PER_KJ: f64 = 1000.0;
}

/// Rider-adjustable power bias
pub mod bias {
    /// Smallest accepted bias multiplier
    pub const MIN_POWER_BIAS: f64 = 0.8;

    /// Largest accepted bias multiplier
    pub const MAX_POWER_BIAS: f64 = 1.3;

    /// Increment used by step adjustments
    pub const POWER_BIAS_STEP: f64 = 0.01;

    /// Difference from 1.0 below which the bias counts as inactive
    pub const ACTIVE_EPSILON: f64 = 1e-3;
}

/// Display-only power smoothing
pub mod smoothing {
    /// Longest smoothing window in seconds
    pub const MAX_WINDOW_SECONDS: f64 = 5.0;
}

/// Distance conversions
pub mod distance {
    /// Metres per kilometre
    pub const METRES_PER_KM: f64 = 1000.0;
}

/// Time conversions
pub mod time {
    /// Milliseconds per second
    pub const MS_PER_SECOND: f64 = 1000.0;

    /// Seconds per hour
    pub const SECONDS_PER_HOUR: f64 = 3600.0;

    /// Seconds per minute
    pub const SECONDS_PER_MINUTE: f64 = 60.0;
}

/// Sync topics shared by publishing and subscribing instances
pub mod topics {
    /// Topic prefix for finish predictions
    pub const PREDICTIONS: &str = "tt:predictions";

    /// Topic prefix for live interval average power
    pub const INTERVAL_AVG: &str = "tt:interval-avg";

    /// Topic for shared-state patches
    pub const SHARED_STATE: &str = "tt:shared-state";

    /// Scope used when no home athlete is known
    pub const GLOBAL_SCOPE: &str = "global";
}

/// Session-level defaults for the root service
pub mod session {
    /// Buffered messages per sync topic
    pub const DEFAULT_SYNC_CAPACITY: usize = 64;

    /// Directory under the user config dir holding persisted state
    pub const STATE_DIR_NAME: &str = "tt-pacer";

    /// Persisted state file name
    pub const STATE_FILE_NAME: &str = "state.json";
}

/// Service names used for structured logging
pub mod service_names {
    /// Name of the replay/pacing service
    pub const TT_PACER: &str = "tt-pacer";
}
