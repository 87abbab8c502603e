use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fall_sentinel::{Config, FrameReader, LogAlertSink, Monitor};

/// Live fall monitor fed by a pose-landmark stream.
#[derive(Parser, Debug)]
#[command(name = "fall-sentinel", version, about, long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Newline-delimited JSON pose frames. Reads stdin when omitted.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Print one JSON frame report per frame on stdout.
    #[arg(long, default_value_t = false)]
    emit_json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    info!("Fall Sentinel v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };

    let input: Box<dyn BufRead> = match args.input.as_deref() {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let mut monitor = Monitor::new(&config, vec![Box::new(LogAlertSink)])?;
    let mut frames = FrameReader::new(input);
    if args.emit_json {
        let mut stdout = io::stdout().lock();
        monitor.run(&mut frames, Some(&mut stdout))?;
    } else {
        monitor.run(&mut frames, None)?;
    }

    let summary = monitor.finish();
    info!(
        frames = summary.frames,
        misses = summary.misses,
        alerts = summary.alerts_sent,
        suppressed = summary.alerts_suppressed,
        dropped = summary.alerts_dropped,
        "stream ended"
    );
    Ok(())
}
