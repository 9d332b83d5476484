//! Scan progress reporting.
//!
//! Progress goes to **stderr** so stdout stays parseable for scripts.

use std::io::{IsTerminal, Write};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanProgressEvent {
    /// Walking and hashing the context's roots. Total unknown.
    Discovering { context: String },
    /// Saving file `n` of `total`.
    Ingesting {
        context: String,
        n: u64,
        total: u64,
        source: String,
    },
}

pub trait ScanProgressReporter: Send + Sync {
    fn report(&self, event: ScanProgressEvent);
}

/// Human-friendly progress: "scan docs  ingesting  12 / 1,400 files  notes.txt".
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: ScanProgressEvent) {
        let line = match &event {
            ScanProgressEvent::Discovering { context } => {
                format!("scan {}  discovering...\n", context)
            }
            ScanProgressEvent::Ingesting {
                context,
                n,
                total,
                source,
            } => format!(
                "scan {}  ingesting  {} / {} files  {}\n",
                context,
                format_number(*n),
                format_number(*total),
                source
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: ScanProgressEvent) {
        let obj = match &event {
            ScanProgressEvent::Discovering { context } => serde_json::json!({
                "event": "progress",
                "context": context,
                "phase": "discovering"
            }),
            ScanProgressEvent::Ingesting {
                context,
                n,
                total,
                source,
            } => serde_json::json!({
                "event": "progress",
                "context": context,
                "phase": "ingesting",
                "n": n,
                "total": total,
                "source": source
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: ScanProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a terminal, otherwise off.
    pub fn default_for_tty() -> Self {
        if std::io::stderr().is_terminal() {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
