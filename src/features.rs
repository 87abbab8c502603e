//! Kinematic features for fall detection
//!
//! - Head velocity: vertical nose speed in normalized units per second
//! - Torso angle: shoulder-mid to hip-mid axis, 0° flat, 90° upright
//! - Height: vertical extent of all landmarks, a standing/floor gate

use std::time::Instant;

use crate::landmark::{LandmarkSet, LEFT_HIP, LEFT_SHOULDER, RIGHT_HIP, RIGHT_SHOULDER};

/// Floor for a zero horizontal torso displacement
const MIN_TORSO_DX: f32 = 0.00001;

/// Per-frame feature values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    /// Head vertical velocity, positive = moving down the image
    pub velocity: f32,
    /// Torso inclination from horizontal in degrees [0, 90]
    pub angle_deg: f32,
    /// max(y) - min(y) over all landmarks
    pub height: f32,
    /// Velocity exceeded the drop threshold
    pub is_falling: bool,
    /// Angle below the fall-angle threshold
    pub is_horizontal: bool,
}

/// Extracts [`Features`] and remembers the previous head sample
pub struct FeatureExtractor {
    drop_velocity_threshold: f32,
    fall_angle_threshold_deg: f32,
    prev_sample: Option<(f32, Instant)>,
}

impl FeatureExtractor {
    pub fn new(drop_velocity_threshold: f32, fall_angle_threshold_deg: f32) -> Self {
        Self {
            drop_velocity_threshold,
            fall_angle_threshold_deg,
            prev_sample: None,
        }
    }

    pub fn extract(&mut self, landmarks: &LandmarkSet, now: Instant) -> Features {
        let head_y = landmarks.nose().y;
        let velocity = self.head_velocity(head_y, now);
        self.prev_sample = Some((head_y, now));

        let angle_deg = torso_angle(landmarks);
        let height = body_height(landmarks);

        Features {
            velocity,
            angle_deg,
            height,
            is_falling: velocity > self.drop_velocity_threshold,
            is_horizontal: angle_deg < self.fall_angle_threshold_deg,
        }
    }

    fn head_velocity(&self, head_y: f32, now: Instant) -> f32 {
        let Some((prev_y, prev_time)) = self.prev_sample else {
            return 0.0;
        };
        let dt = match now.checked_duration_since(prev_time) {
            Some(d) => d.as_secs_f32(),
            None => return 0.0,
        };
        if dt <= 0.0 {
            return 0.0;
        }
        (head_y - prev_y) / dt
    }

    /// Last (head_y, time) sample, if any
    pub fn previous_sample(&self) -> Option<(f32, Instant)> {
        self.prev_sample
    }
}

/// Torso inclination from horizontal in degrees
///
/// Uses atan(|dy/dx|) so the result is always in [0, 90] regardless of
/// which way the subject faces.
pub fn torso_angle(landmarks: &LandmarkSet) -> f32 {
    let (msx, msy) = landmarks.midpoint(LEFT_SHOULDER, RIGHT_SHOULDER);
    let (mhx, mhy) = landmarks.midpoint(LEFT_HIP, RIGHT_HIP);

    let dy = mhy - msy;
    let mut dx = mhx - msx;
    if dx == 0.0 {
        dx = MIN_TORSO_DX;
    }

    (dy / dx).abs().atan().to_degrees()
}

/// Vertical bounding extent of the landmark set
pub fn body_height(landmarks: &LandmarkSet) -> f32 {
    let (min, max) = landmarks
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), lm| {
            (lo.min(lm.y), hi.max(lm.y))
        });
    max - min
}
