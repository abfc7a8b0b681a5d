//! Output placer – resolves the batch directory and per-record file names.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ForgeError;
use crate::records::{AttendeeBatch, AttendeeRecord};
use crate::sanitize::sanitize;

/// Where the batch's certificates go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputDir {
    /// Use this directory as-is.
    Explicit(PathBuf),
    /// Derive `{root}/{EventTitle}_{EventDate}` from the first record.
    #[default]
    AutoDerive,
}

/// Resolve the output directory for `batch` without touching the filesystem.
///
/// Tables without an `EventTitle` or `EventDate` column fall back to
/// `Event` and today's date (`YYYYMMDD`).
pub fn resolve_dir(choice: &OutputDir, batch: &AttendeeBatch, root: &Path) -> PathBuf {
    match choice {
        OutputDir::Explicit(path) => path.clone(),
        OutputDir::AutoDerive => {
            let first = batch.first();
            let title = match first {
                Some(rec) if batch.has_column("EventTitle") => sanitize(rec.event_title()),
                _ => "Event".to_string(),
            };
            let date = match first {
                Some(rec) if batch.has_column("EventDate") => sanitize(rec.event_date()),
                _ => chrono::Local::now().format("%Y%m%d").to_string(),
            };
            root.join(format!("{title}_{date}"))
        }
    }
}

/// `{LastName}-{FirstName}-{EventTitle}-{EventDate}.pdf`, each part sanitized.
pub fn certificate_file_name(record: &AttendeeRecord) -> String {
    format!(
        "{}-{}-{}-{}.pdf",
        sanitize(record.last_name()),
        sanitize(record.first_name()),
        sanitize(record.event_title()),
        sanitize(record.event_date()),
    )
}

/// Writes certificates into one resolved directory.
///
/// Two records that map to the same file name overwrite each other; the
/// last write wins.
#[derive(Debug)]
pub struct OutputPlacer {
    dir: PathBuf,
    written: HashSet<String>,
}

impl OutputPlacer {
    /// Create `dir` (and parents) if missing. An existing directory is fine.
    pub fn create(dir: PathBuf) -> Result<Self, ForgeError> {
        fs::create_dir_all(&dir).map_err(|source| ForgeError::OutputDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            written: HashSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` as `record`'s certificate and return the file path.
    pub fn write(&mut self, record: &AttendeeRecord, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let name = certificate_file_name(record);
        let path = self.dir.join(&name);
        fs::write(&path, bytes)?;
        if !self.written.insert(name) {
            log::debug!("overwrote {} (duplicate file name in batch)", path.display());
        }
        Ok(path)
    }
}
