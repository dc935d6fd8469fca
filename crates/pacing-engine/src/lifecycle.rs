// ABOUTME: Event lifecycle detection from athlete, subgroup, course and progress telemetry
// ABOUTME: Reports rider swaps, pen entry/exit, event and course changes, resets and start-line crossing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Event Lifecycle
//!
//! Checks run in priority order and the first match wins:
//!
//! 1. athlete changed (rider swap)
//! 2. subgroup appeared for the same athlete (entered the pen)
//! 3. subgroup changed to another event
//! 4. subgroup disappeared (left the event)
//! 5. course changed
//! 6. progress dropped from positive to exactly zero
//!
//! Afterwards the start line is detected from a positive race clock inside a
//! subgroup, or, failing that, from progress moving off zero. Every
//! transition asks the owner to reset tracking.

use std::fmt;

use serde::Serialize;

/// How the start line was detected
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "signal", content = "value")]
pub enum StartSignal {
    /// Race clock became positive (seconds)
    RaceClock(f64),
    /// Progress moved off zero (metres)
    Distance(f64),
}

/// A lifecycle change that invalidates tracking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum LifecycleTransition {
    /// Telemetry now belongs to a different athlete
    RiderSwap {
        /// Previous athlete
        from: String,
        /// Current athlete
        to: String,
    },
    /// The athlete joined an event pen
    PenEntry {
        /// Subgroup joined
        subgroup: String,
    },
    /// The athlete moved to a different event
    EventChange {
        /// Previous subgroup
        from: String,
        /// Current subgroup
        to: String,
    },
    /// The athlete left the event
    PenExit {
        /// Subgroup left
        subgroup: String,
    },
    /// World or route changed
    CourseChange {
        /// Previous course
        from: String,
        /// Current course
        to: String,
    },
    /// Progress went back to zero after warm-up
    DistanceReset {
        /// Progress before the reset (metres)
        previous_m: f64,
    },
    /// The rider crossed the start line
    StartLine(StartSignal),
}

impl LifecycleTransition {
    /// True for the start-line crossing
    #[must_use]
    pub const fn is_start(&self) -> bool {
        matches!(self, Self::StartLine(_))
    }
}

impl fmt::Display for LifecycleTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RiderSwap { from, to } => write!(f, "athlete changed from {from} to {to}"),
            Self::PenEntry { subgroup } => write!(f, "entered event pen {subgroup}"),
            Self::EventChange { from, to } => write!(f, "event changed from {from} to {to}"),
            Self::PenExit { subgroup } => write!(f, "left event pen {subgroup}"),
            Self::CourseChange { from, to } => write!(f, "course changed from {from} to {to}"),
            Self::DistanceReset { previous_m } => {
                write!(f, "distance reset to 0 m (was {previous_m:.0} m)")
            }
            Self::StartLine(StartSignal::RaceClock(seconds)) => {
                write!(f, "start line crossed, race clock {seconds:.0} s")
            }
            Self::StartLine(StartSignal::Distance(meters)) => {
                write!(f, "start line crossed at {meters:.0} m")
            }
        }
    }
}

/// Identity and progress observed on one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleObservation<'a> {
    /// Normalised athlete id
    pub athlete_id: Option<&'a str>,
    /// Normalised event subgroup id
    pub subgroup_id: Option<&'a str>,
    /// Normalised course id
    pub course_id: Option<&'a str>,
    /// Event progress (metres)
    pub progress_m: Option<f64>,
    /// Race clock (seconds)
    pub race_clock: Option<f64>,
}

/// Last-seen identity and progress
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleDetector {
    last_athlete: Option<String>,
    last_subgroup: Option<String>,
    last_course: Option<String>,
    last_distance_m: Option<f64>,
    started: bool,
}

impl LifecycleDetector {
    /// Detector with nothing observed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the start line has been crossed since the last reset
    #[must_use]
    pub const fn event_has_started(&self) -> bool {
        self.started
    }

    /// Forget the start flag and last progress; identities are kept
    pub fn reset_event(&mut self) {
        self.started = false;
        self.last_distance_m = None;
    }

    /// Inspect one tick
    pub fn inspect(&mut self, obs: &LifecycleObservation<'_>) -> Option<LifecycleTransition> {
        let current_distance = obs.progress_m.unwrap_or(0.0);
        let athlete = obs.athlete_id.map(str::to_owned);
        let subgroup = obs.subgroup_id.map(str::to_owned);
        let course = obs.course_id.map(str::to_owned);

        if let (Some(last), Some(current)) = (&self.last_athlete, &athlete) {
            if last != current {
                let transition = LifecycleTransition::RiderSwap {
                    from: last.clone(),
                    to: current.clone(),
                };
                self.reset_event();
                self.last_athlete = athlete;
                self.last_subgroup = subgroup;
                self.last_course = course;
                return Some(transition);
            }
        }

        if self.last_subgroup.is_none() && athlete.is_some() && athlete == self.last_athlete {
            if let Some(current) = &subgroup {
                let transition = LifecycleTransition::PenEntry {
                    subgroup: current.clone(),
                };
                self.reset_event();
                self.last_subgroup = subgroup;
                self.last_course = course;
                return Some(transition);
            }
        }

        if let (Some(last), Some(current)) = (&self.last_subgroup, &subgroup) {
            if last != current {
                let transition = LifecycleTransition::EventChange {
                    from: last.clone(),
                    to: current.clone(),
                };
                self.reset_event();
                self.last_athlete = athlete;
                self.last_subgroup = subgroup;
                self.last_course = course;
                return Some(transition);
            }
        }

        if subgroup.is_none() {
            if let Some(last) = self.last_subgroup.take() {
                self.reset_event();
                return Some(LifecycleTransition::PenExit { subgroup: last });
            }
        }

        if let (Some(last), Some(current)) = (&self.last_course, &course) {
            if last != current {
                let transition = LifecycleTransition::CourseChange {
                    from: last.clone(),
                    to: current.clone(),
                };
                self.reset_event();
                self.last_athlete = athlete;
                self.last_subgroup = subgroup;
                self.last_course = course;
                return Some(transition);
            }
        }

        if self.last_athlete.is_none() {
            self.last_athlete = athlete;
        }
        if self.last_subgroup.is_none() {
            self.last_subgroup = subgroup;
        }
        if self.last_course.is_none() {
            self.last_course = course;
        }
        let last_distance = *self.last_distance_m.get_or_insert(current_distance);

        if last_distance > 0.0 && current_distance == 0.0 {
            self.started = false;
            self.last_distance_m = Some(0.0);
            return Some(LifecycleTransition::DistanceReset {
                previous_m: last_distance,
            });
        }

        let mut transition = None;
        if let Some(clock) = obs.race_clock.filter(|c| c.is_finite() && *c > 0.0) {
            if obs.subgroup_id.is_some() && !self.started {
                self.started = true;
                transition = Some(LifecycleTransition::StartLine(StartSignal::RaceClock(clock)));
            }
        }
        if !self.started && last_distance == 0.0 && current_distance > 0.0 {
            self.started = true;
            transition = Some(LifecycleTransition::StartLine(StartSignal::Distance(
                current_distance,
            )));
        }

        self.last_distance_m = Some(current_distance);
        transition
    }
}
