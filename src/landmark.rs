//! Pose landmark data model.
//!
//! A [`LandmarkSet`] always holds exactly 33 keypoints in the BlazePose
//! layout, so feature code can index semantic slots directly.

use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// Number of keypoints produced by the pose model.
pub const LANDMARK_COUNT: usize = 33;

pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;

/// A single keypoint in normalized image coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "full_confidence")]
    pub visibility: f32,
    #[serde(default = "full_confidence")]
    pub presence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Landmark {
    /// Fully visible landmark at the given position.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
            presence: 1.0,
        }
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// One frame's worth of landmarks for a single subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet([Landmark; LANDMARK_COUNT]);

impl LandmarkSet {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self(landmarks)
    }

    /// Every slot set to the same landmark.
    pub fn filled(landmark: Landmark) -> Self {
        Self([landmark; LANDMARK_COUNT])
    }

    pub fn nose(&self) -> &Landmark {
        &self.0[NOSE]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.0.iter()
    }

    /// Midpoint of two landmarks in the image plane.
    pub fn midpoint(&self, a: usize, b: usize) -> (f32, f32) {
        let (a, b) = (&self.0[a], &self.0[b]);
        ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }
}

impl std::ops::Index<usize> for LandmarkSet {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.0[index]
    }
}

impl std::ops::IndexMut<usize> for LandmarkSet {
    fn index_mut(&mut self, index: usize) -> &mut Landmark {
        &mut self.0[index]
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = SentinelError;

    fn try_from(landmarks: Vec<Landmark>) -> Result<Self, Self::Error> {
        let actual = landmarks.len();
        <[Landmark; LANDMARK_COUNT]>::try_from(landmarks)
            .map(Self)
            .map_err(|_| SentinelError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual,
            })
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.0.to_vec()
    }
}
