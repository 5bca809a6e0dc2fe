//! Per-poll record stream
//!
//! One JSON object per line, flushed as soon as it is written, in hourly files
//! named `<prefix>-YYYYMMDD-HH.jsonl`. All vehicle tasks share one sink; the
//! open file and the rotation boundary sit behind a single mutex so records
//! never interleave across a rotation.

use crate::error::{Result, VigilError};
use crate::monitor::MonitorState;
use crate::vehicle::VehicleSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// What a vehicle's monitor saw in one cycle
#[derive(Debug, Serialize)]
pub struct PollRecord<'a> {
    pub ts: i64,
    pub vehicle: &'a str,
    pub state: MonitorState,
    pub scope: &'a str,
    pub data: &'a VehicleSnapshot,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    run_id: &'a Uuid,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct Diagnostic<'a> {
    ts: i64,
    message: &'a str,
}

#[derive(Default)]
struct OpenFile {
    hour: Option<String>,
    path: Option<PathBuf>,
    file: Option<File>,
    rotations: u32,
}

pub struct RecordSink {
    directory: PathBuf,
    prefix: String,
    run_id: Uuid,
    current: Mutex<OpenFile>,
}

impl RecordSink {
    pub fn new<P: AsRef<Path>>(directory: P, prefix: &str) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            prefix: prefix.to_string(),
            run_id: Uuid::new_v4(),
            current: Mutex::new(OpenFile::default()),
        })
    }

    /// Tag carried by every record of this process
    pub const fn run_id(&self) -> &Uuid {
        &self.run_id
    }

    pub fn write_record(&self, record: &PollRecord<'_>) -> Result<()> {
        self.write_record_at(record, Utc::now())
    }

    pub fn write_record_at(&self, record: &PollRecord<'_>, now: DateTime<Utc>) -> Result<()> {
        self.append(record, now)
    }

    /// Free-text diagnostic line
    pub fn write_line(&self, message: &str) -> Result<()> {
        let now = Utc::now();
        let line = Diagnostic {
            ts: now.timestamp(),
            message,
        };
        self.append(&line, now)
    }

    /// Start a new file even if the hour has not changed
    pub fn rotate(&self) -> Result<()> {
        self.rotate_at(Utc::now())
    }

    pub fn rotate_at(&self, now: DateTime<Utc>) -> Result<()> {
        let mut current = self.lock()?;
        self.open(&mut current, now, true)
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock().ok().and_then(|c| c.path.clone())
    }

    fn append<T: Serialize>(&self, body: &T, now: DateTime<Utc>) -> Result<()> {
        let mut line = serde_json::to_vec(&Envelope {
            run_id: &self.run_id,
            body,
        })?;
        line.push(b'\n');

        let mut current = self.lock()?;
        self.open(&mut current, now, false)?;
        let file = current
            .file
            .as_mut()
            .ok_or_else(|| VigilError::io("Record file is not open"))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn open(&self, current: &mut OpenFile, now: DateTime<Utc>, force: bool) -> Result<()> {
        let hour = now.format("%Y%m%d-%H").to_string();
        let same_hour = current.hour.as_deref() == Some(hour.as_str());
        if current.file.is_some() && same_hour && !force {
            return Ok(());
        }

        current.rotations = if same_hour { current.rotations + 1 } else { 0 };
        let name = if current.rotations == 0 {
            format!("{}-{hour}.jsonl", self.prefix)
        } else {
            format!("{}-{hour}-{}.jsonl", self.prefix, current.rotations)
        };
        let path = self.directory.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        current.file = Some(file);
        current.path = Some(path);
        current.hour = Some(hour);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, OpenFile>> {
        self.current
            .lock()
            .map_err(|_| VigilError::io("Record sink lock poisoned"))
    }
}
