//! Fall state machine
//!
//! Composes smoothing, feature extraction and a three-state hysteresis
//! machine. One analyzer per monitored stream; feed it one frame at a time
//! with a monotonic timestamp.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::SentinelError;
use crate::features::{FeatureExtractor, Features};
use crate::landmark::LandmarkSet;
use crate::smoothing::LandmarkSmoother;

/// Reported classification for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallStatus {
    Normal,
    PotentialFall,
    FallDetected,
}

impl FallStatus {
    pub fn name(&self) -> &'static str {
        match self {
            FallStatus::Normal => "NORMAL",
            FallStatus::PotentialFall => "POTENTIAL_FALL",
            FallStatus::FallDetected => "FALL_DETECTED",
        }
    }
}

impl fmt::Display for FallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub status: FallStatus,
    /// Smoothed landmarks, `None` on a detection miss
    pub landmarks: Option<LandmarkSet>,
    pub angle_deg: f32,
    pub velocity: f32,
}

impl Analysis {
    fn no_detection() -> Self {
        Self {
            status: FallStatus::Normal,
            landmarks: None,
            angle_deg: 0.0,
            velocity: 0.0,
        }
    }
}

/// Gates and timers the state machine applies to [`Features`]
#[derive(Debug, Clone, Copy)]
struct Gates {
    entry_height: f32,
    recovery_height: f32,
    lying_confirm: Duration,
    potential_fall_timeout: Duration,
}

/// Stored state. Timers live inside the variant they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    PotentialFall {
        fall_start: Instant,
        lying_start: Option<Instant>,
    },
    FallDetected,
}

pub struct FallAnalyzer {
    smoother: LandmarkSmoother,
    extractor: FeatureExtractor,
    gates: Gates,
    state: State,
}

impl FallAnalyzer {
    /// Build an analyzer for one stream. Rejects out-of-range settings.
    pub fn new(config: &DetectionConfig) -> Result<Self, SentinelError> {
        config.validate()?;
        Ok(Self {
            smoother: LandmarkSmoother::new(config.smoothing_window),
            extractor: FeatureExtractor::new(
                config.drop_velocity_threshold,
                config.fall_angle_threshold_deg,
            ),
            gates: Gates {
                entry_height: config.entry_height_gate,
                recovery_height: config.recovery_height_gate,
                lying_confirm: config.lying_confirm()?,
                potential_fall_timeout: config.potential_fall_timeout()?,
            },
            state: State::Normal,
        })
    }

    /// Analyze one frame.
    ///
    /// `None` means the pose model found nobody this frame: NORMAL is
    /// reported and no internal state is touched, so a momentary miss never
    /// resets timers or fakes a recovery.
    pub fn analyze(&mut self, raw: Option<&LandmarkSet>, now: Instant) -> Analysis {
        let Some(raw) = raw else {
            return Analysis::no_detection();
        };

        let landmarks = self.smoother.smooth(raw);
        let features = self.extractor.extract(&landmarks, now);
        let status = self.step(&features, now);

        Analysis {
            status,
            landmarks: Some(landmarks),
            angle_deg: features.angle_deg,
            velocity: features.velocity,
        }
    }

    /// Advance the state machine on one frame's features.
    pub fn step(&mut self, features: &Features, now: Instant) -> FallStatus {
        let (next, status) = transition(self.state, features, now, &self.gates);
        if next != self.state {
            tracing::debug!(
                from = ?self.state,
                to = ?next,
                velocity = features.velocity,
                angle_deg = features.angle_deg,
                height = features.height,
                "fall state transition"
            );
        }
        self.state = next;
        status
    }

    /// Current stored state
    pub fn status(&self) -> FallStatus {
        match self.state {
            State::Normal => FallStatus::Normal,
            State::PotentialFall { .. } => FallStatus::PotentialFall,
            State::FallDetected => FallStatus::FallDetected,
        }
    }

    /// When the current suspected fall started, if any
    pub fn fall_start(&self) -> Option<Instant> {
        match self.state {
            State::PotentialFall { fall_start, .. } => Some(fall_start),
            _ => None,
        }
    }

    /// When the subject was first seen horizontal during the current suspected fall
    pub fn lying_start(&self) -> Option<Instant> {
        match self.state {
            State::PotentialFall { lying_start, .. } => lying_start,
            _ => None,
        }
    }

    pub fn smoother(&self) -> &LandmarkSmoother {
        &self.smoother
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }
}

fn transition(state: State, f: &Features, now: Instant, gates: &Gates) -> (State, FallStatus) {
    match state {
        State::Normal => {
            // Already low bodies (sitting, lying) cannot start a fall.
            if f.is_falling && f.height > gates.entry_height {
                let next = State::PotentialFall {
                    fall_start: now,
                    lying_start: None,
                };
                (next, FallStatus::PotentialFall)
            } else {
                (State::Normal, FallStatus::Normal)
            }
        }
        State::PotentialFall {
            fall_start,
            lying_start,
        } => {
            if f.is_horizontal {
                let lying_start = lying_start.unwrap_or(now);
                if now.saturating_duration_since(lying_start) > gates.lying_confirm {
                    (State::FallDetected, FallStatus::FallDetected)
                } else {
                    let next = State::PotentialFall {
                        fall_start,
                        lying_start: Some(lying_start),
                    };
                    (next, FallStatus::PotentialFall)
                }
            } else if now.saturating_duration_since(fall_start) > gates.potential_fall_timeout {
                // Fast drop but still upright: sat down or crouched.
                (State::Normal, FallStatus::Normal)
            } else {
                // lying_start is kept across upright flicker.
                (state, FallStatus::PotentialFall)
            }
        }
        State::FallDetected => {
            if !f.is_horizontal && f.height > gates.recovery_height {
                (State::Normal, FallStatus::Normal)
            } else {
                (State::FallDetected, FallStatus::FallDetected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gates() -> Gates {
        Gates {
            entry_height: 0.4,
            recovery_height: 0.5,
            lying_confirm: Duration::from_secs(3),
            potential_fall_timeout: Duration::from_millis(1500),
        }
    }

    fn features(is_falling: bool, is_horizontal: bool, height: f32) -> Features {
        Features {
            velocity: if is_falling { 1.0 } else { 0.0 },
            angle_deg: if is_horizontal { 10.0 } else { 80.0 },
            height,
            is_falling,
            is_horizontal,
        }
    }

    #[test]
    fn normal_to_potential_fall() {
        let now = Instant::now();
        let (next, status) = transition(State::Normal, &features(true, false, 0.7), now, &gates());

        assert_eq!(status, FallStatus::PotentialFall);
        assert_eq!(
            next,
            State::PotentialFall {
                fall_start: now,
                lying_start: None
            }
        );
    }

    #[test]
    fn low_body_does_not_trigger() {
        let now = Instant::now();
        let (next, status) = transition(State::Normal, &features(true, true, 0.3), now, &gates());

        assert_eq!(next, State::Normal);
        assert_eq!(status, FallStatus::Normal);
    }

    #[test]
    fn first_horizontal_reading_starts_lying_clock() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_millis(100);
        let state = State::PotentialFall {
            fall_start: t0,
            lying_start: None,
        };
        let (next, status) = transition(state, &features(false, true, 0.2), now, &gates());

        assert_eq!(status, FallStatus::PotentialFall);
        assert_eq!(
            next,
            State::PotentialFall {
                fall_start: t0,
                lying_start: Some(now)
            }
        );
    }

    #[test]
    fn lying_past_confirmation_detects_fall() {
        let t0 = Instant::now();
        let state = State::PotentialFall {
            fall_start: t0,
            lying_start: Some(t0),
        };

        let at_limit = t0 + Duration::from_secs(3);
        let (_, status) = transition(state, &features(false, true, 0.2), at_limit, &gates());
        assert_eq!(status, FallStatus::PotentialFall);

        let past = t0 + Duration::from_millis(3001);
        let (next, status) = transition(state, &features(false, true, 0.2), past, &gates());
        assert_eq!(status, FallStatus::FallDetected);
        assert_eq!(next, State::FallDetected);
    }

    #[test]
    fn upright_flicker_keeps_lying_clock() {
        let t0 = Instant::now();
        let state = State::PotentialFall {
            fall_start: t0,
            lying_start: Some(t0),
        };
        let now = t0 + Duration::from_millis(500);
        let (next, status) = transition(state, &features(false, false, 0.2), now, &gates());

        assert_eq!(status, FallStatus::PotentialFall);
        assert_eq!(next, state);
    }

    #[test]
    fn upright_after_timeout_aborts() {
        let t0 = Instant::now();
        let state = State::PotentialFall {
            fall_start: t0,
            lying_start: Some(t0 + Duration::from_millis(200)),
        };
        let now = t0 + Duration::from_millis(1600);
        let (next, status) = transition(state, &features(false, false, 0.6), now, &gates());

        assert_eq!(next, State::Normal);
        assert_eq!(status, FallStatus::Normal);
    }

    #[test]
    fn fall_detected_is_sticky() {
        let now = Instant::now() + Duration::from_secs(3600);
        let (next, status) = transition(State::FallDetected, &features(false, true, 0.1), now, &gates());
        assert_eq!(next, State::FallDetected);
        assert_eq!(status, FallStatus::FallDetected);

        // Upright but still compressed is not a recovery.
        let (next, _) = transition(State::FallDetected, &features(false, false, 0.45), now, &gates());
        assert_eq!(next, State::FallDetected);
    }

    #[test]
    fn standing_up_recovers() {
        let now = Instant::now();
        let (next, status) = transition(State::FallDetected, &features(false, false, 0.7), now, &gates());
        assert_eq!(next, State::Normal);
        assert_eq!(status, FallStatus::Normal);
    }

    #[test]
    fn no_detection_leaves_state_alone() {
        let mut analyzer = FallAnalyzer::new(&DetectionConfig::default()).unwrap();
        let t0 = Instant::now();
        analyzer.step(&features(true, false, 0.8), t0);
        assert_eq!(analyzer.status(), FallStatus::PotentialFall);

        let result = analyzer.analyze(None, t0 + Duration::from_secs(5));
        assert_eq!(result.status, FallStatus::Normal);
        assert!(result.landmarks.is_none());
        assert_eq!(analyzer.status(), FallStatus::PotentialFall);
        assert_eq!(analyzer.fall_start(), Some(t0));
        assert!(analyzer.smoother().is_empty());
        assert!(analyzer.extractor().previous_sample().is_none());
    }

    #[test]
    fn new_rejects_unusable_timers() {
        let negative = DetectionConfig {
            lying_confirm_secs: -1.0,
            ..DetectionConfig::default()
        };
        assert!(matches!(
            FallAnalyzer::new(&negative),
            Err(SentinelError::InvalidConfig(_))
        ));

        let nan = DetectionConfig {
            potential_fall_timeout_secs: f64::NAN,
            ..DetectionConfig::default()
        };
        assert!(FallAnalyzer::new(&nan).is_err());
    }

    #[test]
    fn status_names() {
        assert_eq!(FallStatus::PotentialFall.to_string(), "POTENTIAL_FALL");
        assert_eq!(
            serde_json::to_string(&FallStatus::FallDetected).unwrap(),
            "\"FALL_DETECTED\""
        );
    }
}
