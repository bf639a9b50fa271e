//! JSON-lines file sink.
//!
//! Each tagged event is appended to the file as one JSON envelope per line.
//! The file is opened lazily on the first event and kept open afterwards.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use otr_events::{AnalyticsError, Envelope, EventSink};

/// Sink appending envelopes to a JSON-lines file.
pub struct JsonLinesSink {
    /// The path to the events file.
    path: PathBuf,
    /// Open handle, created on first write.
    file: Mutex<Option<File>>,
}

impl JsonLinesSink {
    /// Creates a sink that appends to `path`.
    ///
    /// Does not touch the filesystem until the first event is recorded.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    /// Returns the path to the events file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        tracing::debug!("Opening events file {:?}", self.path);
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl EventSink for JsonLinesSink {
    fn record(&self, envelope: &Envelope) -> otr_events::Result<()> {
        let mut line = envelope.to_json()?;
        line.push('\n');

        let mut guard = self
            .file
            .lock()
            .map_err(|_| AnalyticsError::LockPoisoned("events file"))?;

        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    fn flush(&self) -> otr_events::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| AnalyticsError::LockPoisoned("events file"))?;
        if let Some(file) = guard.as_mut() {
            file.sync_data()?;
        }
        Ok(())
    }
}

/// Reads every envelope from a JSON-lines events file.
///
/// A missing file yields an empty list. Blank lines are skipped; a malformed
/// line is an error naming its line number.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<Envelope>> {
    let path = path.as_ref();

    if !path.exists() {
        tracing::debug!("Events file not found at {:?}, nothing recorded", path);
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open events file: {}", path.display()))?;

    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .with_context(|| format!("Failed to read events file: {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let envelope = Envelope::from_json(&line).with_context(|| {
            format!("Invalid event on line {} of {}", index + 1, path.display())
        })?;
        events.push(envelope);
    }

    Ok(events)
}
