//! Alert dispatch with cooldown.
//!
//! The analyzer reports FALL_DETECTED every frame while a fall persists. The
//! dispatcher turns that into at most one notification per cooldown window.
//! The cooldown is checked on the caller's thread; delivery to the sinks
//! happens on a background worker so a slow sink never stalls frame
//! processing.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::analyzer::FallStatus;
use crate::config::AlertConfig;
use crate::error::SentinelError;

/// Alerts that may wait for delivery before new ones are dropped
const CHANNEL_CAPACITY: usize = 16;

/// A composed notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub event: FallStatus,
    pub location: String,
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl Alert {
    pub fn new(event: FallStatus, location: &str, timestamp: DateTime<Local>) -> Self {
        let message = format!(
            "ALARM: {} detected at {} on {}",
            event,
            location,
            timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        Self {
            event,
            location: location.to_string(),
            timestamp,
            message,
        }
    }
}

/// Destination for alerts (spreadsheet, chat, webhook, ...).
///
/// Sinks run on the dispatcher's worker thread.
pub trait AlertSink: Send {
    fn name(&self) -> &str;

    fn send(&mut self, alert: &Alert) -> Result<(), SentinelError>;
}

/// Writes alerts to the log.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&mut self, alert: &Alert) -> Result<(), SentinelError> {
        tracing::error!(
            event = %alert.event,
            location = %alert.location,
            "{}",
            alert.message
        );
        Ok(())
    }
}

enum DispatchCmd {
    Deliver(Alert),
    Shutdown,
}

pub struct AlertDispatcher {
    location: String,
    cooldown: Duration,
    last_sent: Option<Instant>,
    tx: Sender<DispatchCmd>,
    worker: Option<thread::JoinHandle<()>>,
    sent: u64,
    suppressed: u64,
    dropped: u64,
}

impl AlertDispatcher {
    /// Start the delivery worker that owns `sinks`.
    pub fn new(
        config: &AlertConfig,
        sinks: Vec<Box<dyn AlertSink>>,
    ) -> Result<Self, SentinelError> {
        config.validate()?;
        let cooldown = config.cooldown()?;

        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let worker = thread::Builder::new()
            .name("alert-dispatch".to_string())
            .spawn(move || deliver_loop(sinks, rx))?;

        Ok(Self {
            location: config.location.clone(),
            cooldown,
            last_sent: None,
            tx,
            worker: Some(worker),
            sent: 0,
            suppressed: 0,
            dropped: 0,
        })
    }

    /// Queue `event` for the sinks unless still inside the cooldown window.
    ///
    /// Returns the alert when one was dispatched. Never waits on a sink.
    pub fn notify(&mut self, event: FallStatus, now: Instant) -> Option<Alert> {
        if let Some(last) = self.last_sent {
            if now.saturating_duration_since(last) < self.cooldown {
                self.suppressed += 1;
                tracing::debug!(event = %event, "alert suppressed by cooldown");
                return None;
            }
        }
        self.last_sent = Some(now);
        self.sent += 1;

        let alert = Alert::new(event, &self.location, Local::now());
        match self.tx.try_send(DispatchCmd::Deliver(alert.clone())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::warn!(event = %event, "alert queue full, alert not delivered");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                tracing::warn!(event = %event, "alert worker gone, alert not delivered");
            }
        }
        Some(alert)
    }

    /// Alerts dispatched so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Alerts dropped by the cooldown
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Dispatched alerts that never reached the worker
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Deliver everything already queued, then stop the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = self.tx.send(DispatchCmd::Shutdown);
            if handle.join().is_err() {
                tracing::error!("alert worker panicked");
            }
        }
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn deliver_loop(mut sinks: Vec<Box<dyn AlertSink>>, rx: Receiver<DispatchCmd>) {
    while let Ok(DispatchCmd::Deliver(alert)) = rx.recv() {
        // A failing sink does not stop delivery to the rest.
        for sink in &mut sinks {
            if let Err(e) = sink.send(&alert) {
                tracing::warn!(sink = sink.name(), error = %e, "alert sink failed");
            }
        }
    }
}
