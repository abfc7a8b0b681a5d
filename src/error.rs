//! Error taxonomy for certificate generation.
//!
//! Everything except [`ForgeError::RecordRender`] is batch-fatal and is raised
//! before the first record is attempted. Record failures are collected by the
//! pipeline and never abort the batch.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::convert::ConvertError;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("error reading attendee table '{}': {reason}", path.display())]
    SourceRead { path: PathBuf, reason: String },

    #[error("missing required columns {missing:?}; available columns: {available:?}")]
    Schema {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("attendee table '{}' has no data rows", path.display())]
    EmptyInput { path: PathBuf },

    #[error("error loading template '{}': {reason}", path.display())]
    TemplateLoad { path: PathBuf, reason: String },

    #[error("cannot create output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("certificate for {attendee} failed during {stage}: {source}")]
    RecordRender {
        attendee: String,
        stage: RecordStage,
        #[source]
        source: RecordCause,
    },
}

impl ForgeError {
    /// True for errors that stop the batch before any record is attempted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ForgeError::RecordRender { .. })
    }
}

/// The step of the per-record pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    Render,
    Convert,
    Write,
}

impl fmt::Display for RecordStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordStage::Render => "template rendering",
            RecordStage::Convert => "PDF conversion",
            RecordStage::Write => "file write",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a per-record failure.
#[derive(Debug, Error)]
pub enum RecordCause {
    #[error("{}", render_tera_chain(.0))]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Tera nests the useful message (e.g. a filter failure) in its source chain.
pub(crate) fn render_tera_chain(err: &tera::Error) -> String {
    use std::error::Error as _;

    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_columns() {
        let err = ForgeError::Schema {
            missing: vec!["EventDate".into()],
            available: vec!["FirstName".into(), "LastName".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("EventDate"));
        assert!(msg.contains("LastName"));
        assert!(err.is_fatal());
    }

    #[test]
    fn record_error_is_not_fatal() {
        let err = ForgeError::RecordRender {
            attendee: "Ana Lee".into(),
            stage: RecordStage::Convert,
            source: RecordCause::Convert(ConvertError::EmptyOutput),
        };
        assert!(!err.is_fatal());
        let msg = err.to_string();
        assert!(msg.contains("Ana Lee"));
        assert!(msg.contains("PDF conversion"));
    }
}
