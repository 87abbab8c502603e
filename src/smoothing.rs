//! Moving-average landmark smoothing
//!
//! Keeps the last N raw landmark sets and averages positions across them.
//! Trades up to N-1 frames of lag for less jitter in the angle and
//! velocity math downstream.

use std::collections::VecDeque;

use crate::landmark::{LandmarkSet, LANDMARK_COUNT};

/// Default number of frames to average
pub const DEFAULT_WINDOW: usize = 5;

/// Fixed-window moving-average filter over whole landmark sets
pub struct LandmarkSmoother {
    capacity: usize,
    history: VecDeque<LandmarkSet>,
}

impl LandmarkSmoother {
    /// A zero capacity is treated as 1 (no smoothing).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a raw sample and return the smoothed set.
    ///
    /// x/y/z are averaged per slot over the window. Visibility and presence
    /// come from the newest sample only since they are confidences, not
    /// positions.
    pub fn smooth(&mut self, raw: &LandmarkSet) -> LandmarkSet {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(raw.clone());

        if self.history.len() < 2 {
            return raw.clone();
        }

        let n = self.history.len() as f64;
        let mut out = raw.clone();
        for idx in 0..LANDMARK_COUNT {
            let (mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64);
            for frame in &self.history {
                let lm = &frame[idx];
                sx += lm.x as f64;
                sy += lm.y as f64;
                sz += lm.z as f64;
            }
            let lm = &mut out[idx];
            lm.x = (sx / n) as f32;
            lm.y = (sy / n) as f32;
            lm.z = (sz / n) as f32;
        }
        out
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn uniform(x: f32, y: f32, z: f32) -> LandmarkSet {
        LandmarkSet::filled(Landmark::new(x, y, z))
    }

    #[test]
    fn first_sample_passes_through() {
        let mut smoother = LandmarkSmoother::new(5);
        let raw = uniform(0.3, 0.7, -0.1);
        assert_eq!(smoother.smooth(&raw), raw);
        assert_eq!(smoother.len(), 1);
    }

    #[test]
    fn constant_input_is_reproduced_exactly() {
        let mut smoother = LandmarkSmoother::new(5);
        let raw = uniform(0.1, 0.37, 0.013);
        let mut out = raw.clone();
        for _ in 0..5 {
            out = smoother.smooth(&raw);
        }
        assert_eq!(out, raw);
    }

    #[test]
    fn partial_window_averages_only_seen_samples() {
        let mut smoother = LandmarkSmoother::new(5);
        smoother.smooth(&uniform(0.0, 0.2, 0.0));
        smoother.smooth(&uniform(0.3, 0.4, 0.0));
        let out = smoother.smooth(&uniform(0.6, 0.9, 0.3));

        assert_eq!(smoother.len(), 3);
        for lm in out.iter() {
            assert!((lm.x - 0.3).abs() < 1e-6);
            assert!((lm.y - 0.5).abs() < 1e-6);
            assert!((lm.z - 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn window_evicts_oldest() {
        let mut smoother = LandmarkSmoother::new(2);
        smoother.smooth(&uniform(1.0, 1.0, 1.0));
        smoother.smooth(&uniform(0.0, 0.0, 0.0));
        let out = smoother.smooth(&uniform(0.5, 0.5, 0.5));

        assert_eq!(smoother.len(), 2);
        assert!((out[0].x - 0.25).abs() < 1e-6);
    }

    #[test]
    fn confidence_taken_from_latest_sample() {
        let mut smoother = LandmarkSmoother::new(3);
        let mut first = uniform(0.5, 0.5, 0.0);
        first[0].visibility = 0.9;
        first[0].presence = 0.8;
        let mut second = uniform(0.5, 0.5, 0.0);
        second[0].visibility = 0.2;
        second[0].presence = 0.1;

        smoother.smooth(&first);
        let out = smoother.smooth(&second);
        assert_eq!(out[0].visibility, 0.2);
        assert_eq!(out[0].presence, 0.1);
    }

    #[test]
    fn zero_capacity_disables_smoothing() {
        let mut smoother = LandmarkSmoother::new(0);
        smoother.smooth(&uniform(1.0, 1.0, 1.0));
        let raw = uniform(0.2, 0.2, 0.2);
        assert_eq!(smoother.smooth(&raw), raw);
        assert_eq!(smoother.capacity(), 1);
    }
}
