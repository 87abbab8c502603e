//! Stream monitor
//!
//! Drives a [`FallAnalyzer`] and an [`AlertDispatcher`] from a pose frame
//! stream. Frame timestamps are seconds relative to the moment the monitor
//! was created.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::alert::{AlertDispatcher, AlertSink};
use crate::analyzer::{Analysis, FallAnalyzer, FallStatus};
use crate::config::Config;
use crate::error::SentinelError;
use crate::stream::{FrameReader, FrameReport, PoseFrame};

/// Counters for one monitored stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorSummary {
    pub frames: u64,
    /// Frames where the pose model found nobody
    pub misses: u64,
    pub status_changes: u64,
    pub alerts_sent: u64,
    pub alerts_suppressed: u64,
    pub alerts_dropped: u64,
}

pub struct Monitor {
    analyzer: FallAnalyzer,
    dispatcher: AlertDispatcher,
    start: Instant,
    previous: FallStatus,
    frames: u64,
    misses: u64,
    status_changes: u64,
}

impl Monitor {
    pub fn new(config: &Config, sinks: Vec<Box<dyn AlertSink>>) -> Result<Self, SentinelError> {
        Ok(Self {
            analyzer: FallAnalyzer::new(&config.detection)?,
            dispatcher: AlertDispatcher::new(&config.alert, sinks)?,
            start: Instant::now(),
            previous: FallStatus::Normal,
            frames: 0,
            misses: 0,
            status_changes: 0,
        })
    }

    /// Analyze one frame and raise an alert on FALL_DETECTED.
    pub fn process(&mut self, frame: &PoseFrame) -> Result<Analysis> {
        let offset = Duration::try_from_secs_f64(frame.t)
            .with_context(|| format!("unusable timestamp t = {}", frame.t))?;
        let now = self
            .start
            .checked_add(offset)
            .ok_or_else(|| anyhow!("timestamp t = {} is out of range", frame.t))?;

        self.frames += 1;
        let detected = frame.landmarks.is_some();
        if !detected {
            self.misses += 1;
        }

        let analysis = self.analyzer.analyze(frame.landmarks.as_ref(), now);

        // A miss reports NORMAL without touching the analyzer; not a real change.
        if detected && analysis.status != self.previous {
            match analysis.status {
                FallStatus::FallDetected => warn!(t = frame.t, "fall detected"),
                status => info!(
                    t = frame.t,
                    from = %self.previous,
                    to = %status,
                    angle_deg = analysis.angle_deg,
                    velocity = analysis.velocity,
                    "status changed"
                ),
            }
            self.previous = analysis.status;
            self.status_changes += 1;
        }

        if analysis.status == FallStatus::FallDetected {
            self.dispatcher.notify(analysis.status, now);
        }

        Ok(analysis)
    }

    /// Process every frame in `frames`, writing one JSON [`FrameReport`]
    /// line per frame to `report` when given.
    pub fn run<R: BufRead>(
        &mut self,
        frames: &mut FrameReader<R>,
        mut report: Option<&mut dyn Write>,
    ) -> Result<()> {
        while let Some(frame) = frames.read_frame()? {
            let analysis = self
                .process(&frame)
                .with_context(|| format!("frame on line {}", frames.line_number()))?;

            if let Some(out) = report.as_mut() {
                serde_json::to_writer(&mut **out, &FrameReport::new(frame.t, &analysis))?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> MonitorSummary {
        MonitorSummary {
            frames: self.frames,
            misses: self.misses,
            status_changes: self.status_changes,
            alerts_sent: self.dispatcher.sent(),
            alerts_suppressed: self.dispatcher.suppressed(),
            alerts_dropped: self.dispatcher.dropped(),
        }
    }

    pub fn analyzer(&self) -> &FallAnalyzer {
        &self.analyzer
    }

    /// Wait for queued alerts to be delivered and return the final counters.
    pub fn finish(self) -> MonitorSummary {
        let summary = self.summary();
        self.dispatcher.shutdown();
        summary
    }
}
