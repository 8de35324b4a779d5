// src/logging.rs
//
// Telemetry sinks for rollouts.
// - EventSink: trait used by the rollout driver
// - NoopSink:  discards all events
// - JsonlSink: one serde_json object per line, env-configurable
//
// Environment variables:
// - PROSPECTOR_TRACE_MODE: "off" (default) or "jsonl"
// - PROSPECTOR_TRACE_PATH: output file, required when mode is "jsonl"
//
// The engine never logs; sinks are driven from outside `step`.

use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;

use crate::env::StepResult;
use crate::rollout::EpisodeSummary;

pub const ENV_TRACE_MODE: &str = "PROSPECTOR_TRACE_MODE";
pub const ENV_TRACE_PATH: &str = "PROSPECTOR_TRACE_PATH";

/// Abstract sink for per-step and per-episode telemetry.
pub trait EventSink {
    fn log_step(&mut self, seed: u64, step: u64, action: i64, result: &StepResult);

    fn log_episode(&mut self, summary: &EpisodeSummary);

    fn flush(&mut self) {}
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_step(&mut self, _seed: u64, _step: u64, _action: i64, _result: &StepResult) {
        // intentionally no-op
    }

    fn log_episode(&mut self, _summary: &EpisodeSummary) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    Off,
    Jsonl,
}

impl TraceMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "jsonl" => TraceMode::Jsonl,
            _ => TraceMode::Off,
        }
    }
}

/// JSONL file sink.
///
/// The file is opened lazily on the first event. Open or write failures turn
/// the sink off for the rest of the process instead of surfacing to the caller.
pub struct JsonlSink {
    mode: TraceMode,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl JsonlSink {
    /// Sink writing to `path`, truncating any existing file.
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            mode: TraceMode::Jsonl,
            path: Some(path.as_ref().to_path_buf()),
            writer: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            mode: TraceMode::Off,
            path: None,
            writer: None,
        }
    }

    /// Never fails: misconfiguration yields a disabled sink.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = lookup(ENV_TRACE_MODE)
            .map(|raw| TraceMode::parse(&raw))
            .unwrap_or(TraceMode::Off);
        if mode == TraceMode::Off {
            return Self::disabled();
        }
        match lookup(ENV_TRACE_PATH) {
            Some(path) if !path.trim().is_empty() => Self::create(path.trim()),
            _ => {
                eprintln!("[trace] WARN: {ENV_TRACE_MODE}=jsonl without {ENV_TRACE_PATH}; tracing off");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode == TraceMode::Jsonl
    }

    fn ensure_writer(&mut self) -> Option<&mut BufWriter<File>> {
        if self.mode != TraceMode::Jsonl {
            return None;
        }
        if self.writer.is_none() {
            let Some(path) = self.path.clone() else {
                self.mode = TraceMode::Off;
                return None;
            };
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match File::create(&path) {
                Ok(file) => self.writer = Some(BufWriter::new(file)),
                Err(err) => {
                    eprintln!("[trace] WARN: cannot open {}: {err}; tracing off", path.display());
                    self.mode = TraceMode::Off;
                    return None;
                }
            }
        }
        self.writer.as_mut()
    }

    /// Write one record as a single line.
    pub fn log_record<T: Serialize>(&mut self, record: &T) {
        let Some(writer) = self.ensure_writer() else {
            return;
        };
        let line = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(_) => return,
        };
        if writeln!(writer, "{line}").is_err() {
            self.mode = TraceMode::Off;
            self.writer = None;
        }
    }
}

impl EventSink for JsonlSink {
    fn log_step(&mut self, seed: u64, step: u64, action: i64, result: &StepResult) {
        if !self.is_enabled() {
            return;
        }
        let info = &result.info;
        self.log_record(&json!({
            "event": "step",
            "seed": seed,
            "step": step,
            "action": action,
            "dt": info.dt,
            "invalid_action": info.invalid_action,
            "reward": result.reward,
            "terminated": result.terminated,
            "truncated": result.truncated,
            "credits": info.credits,
            "time_remaining": info.time_remaining,
            "node_context": info.node_context,
        }));
    }

    fn log_episode(&mut self, summary: &EpisodeSummary) {
        if !self.is_enabled() {
            return;
        }
        self.log_record(&json!({
            "event": "episode",
            "summary": summary,
        }));
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}
