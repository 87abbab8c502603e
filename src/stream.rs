use std::io::BufRead;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analyzer::{Analysis, FallStatus};
use crate::landmark::LandmarkSet;

/// One pose-model output: a timestamp and either a subject or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Seconds since the start of the stream
    pub t: f64,
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
}

/// Per-frame output for a renderer or dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub t: f64,
    pub status: FallStatus,
    pub angle_deg: f32,
    pub velocity: f32,
}

impl FrameReport {
    pub fn new(t: f64, analysis: &Analysis) -> Self {
        Self {
            t,
            status: analysis.status,
            angle_deg: analysis.angle_deg,
            velocity: analysis.velocity,
        }
    }
}

/// Reads newline-delimited JSON pose frames.
pub struct FrameReader<R> {
    reader: R,
    line: String,
    line_no: usize,
    last_t: Option<f64>,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            last_t: None,
        }
    }

    /// Next frame, or `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<PoseFrame>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .with_context(|| format!("reading line {}", self.line_no + 1))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            let frame: PoseFrame = serde_json::from_str(text)
                .with_context(|| format!("invalid pose frame on line {}", self.line_no))?;

            if let Some(last) = self.last_t {
                if frame.t < last {
                    tracing::warn!(
                        line = self.line_no,
                        t = frame.t,
                        previous = last,
                        "timestamp went backwards"
                    );
                }
            }
            self.last_t = Some(frame.t);

            return Ok(Some(frame));
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<PoseFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;
    use std::io::Cursor;

    fn landmarks_json(count: usize) -> String {
        serde_json::to_string(&vec![Landmark::new(0.5, 0.5, 0.0); count]).unwrap()
    }

    #[test]
    fn reads_frames_and_skips_blank_lines() {
        let input = format!(
            "{{\"t\":0.0,\"landmarks\":{}}}\n\n   \n{{\"t\":0.1,\"landmarks\":null}}\n{{\"t\":0.2}}\n",
            landmarks_json(33)
        );
        let mut reader = FrameReader::new(Cursor::new(input));

        let first = reader.read_frame().unwrap().unwrap();
        assert_eq!(first.t, 0.0);
        assert!(first.landmarks.is_some());

        let second = reader.read_frame().unwrap().unwrap();
        assert!(second.landmarks.is_none());
        assert_eq!(reader.line_number(), 4);

        let third = reader.read_frame().unwrap().unwrap();
        assert!(third.landmarks.is_none());

        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn rejects_wrong_landmark_count() {
        let input = format!("{{\"t\":0.0,\"landmarks\":{}}}\n", landmarks_json(21));
        let mut reader = FrameReader::new(Cursor::new(input));
        let err = reader.read_frame().unwrap_err();
        assert!(format!("{err:#}").contains("expected 33 landmarks, got 21"));
    }

    #[test]
    fn iterator_yields_all_frames() {
        let input = "{\"t\":0.0}\n{\"t\":0.5}\n{\"t\":0.4}\n";
        let frames: Vec<PoseFrame> = FrameReader::new(Cursor::new(input))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].t, 0.4);
    }

    #[test]
    fn report_serializes_status_name() {
        let analysis = Analysis {
            status: FallStatus::PotentialFall,
            landmarks: None,
            angle_deg: 30.0,
            velocity: 0.5,
        };
        let json = serde_json::to_string(&FrameReport::new(1.5, &analysis)).unwrap();
        assert!(json.contains("\"status\":\"POTENTIAL_FALL\""));
    }
}
