//! Fall Sentinel - real-time fall detection from pose landmarks
//!
//! Per frame: raw landmarks → [`LandmarkSmoother`] → [`FeatureExtractor`]
//! → fall state machine → [`FallStatus`]. [`FallAnalyzer`] owns the whole
//! pipeline for one monitored stream; [`Monitor`] adds alerting on top.
//!
//! ```
//! use std::time::Instant;
//! use fall_sentinel::{DetectionConfig, FallAnalyzer, FallStatus, Landmark, LandmarkSet};
//!
//! let mut analyzer = FallAnalyzer::new(&DetectionConfig::default()).unwrap();
//! let frame = LandmarkSet::filled(Landmark::new(0.5, 0.5, 0.0));
//! let result = analyzer.analyze(Some(&frame), Instant::now());
//! assert_eq!(result.status, FallStatus::Normal);
//! ```

pub mod alert;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod features;
pub mod landmark;
pub mod monitor;
pub mod smoothing;
pub mod stream;

pub use alert::{Alert, AlertDispatcher, AlertSink, LogAlertSink};
pub use analyzer::{Analysis, FallAnalyzer, FallStatus};
pub use config::{AlertConfig, Config, DetectionConfig};
pub use error::{Result, SentinelError};
pub use features::{FeatureExtractor, Features};
pub use landmark::{Landmark, LandmarkSet, LANDMARK_COUNT};
pub use monitor::{Monitor, MonitorSummary};
pub use smoothing::LandmarkSmoother;
pub use stream::{FrameReader, FrameReport, PoseFrame};
