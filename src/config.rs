//! Run configuration, optionally loaded from a JSON file.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! { "backend": "native", "page": { "orientation": "landscape" } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::convert::{PageOptions, PdfConverter};
use crate::error::ForgeError;
use crate::render::NativeConverter;
use crate::wkhtmltopdf::WkhtmltopdfConverter;

/// Which converter turns rendered HTML into PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// External `wkhtmltopdf` executable.
    #[default]
    Wkhtmltopdf,
    /// In-process text layout with `printpdf`.
    Native,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub backend: Backend,
    /// Explicit converter executable; takes precedence over `WKHTMLTOPDF_PATH`.
    pub wkhtmltopdf_path: Option<PathBuf>,
    /// Per-record conversion timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    /// Parent of auto-derived output directories.
    pub output_root: PathBuf,
    pub page: PageOptions,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Wkhtmltopdf,
            wkhtmltopdf_path: None,
            timeout_secs: None,
            output_root: PathBuf::from("output"),
            page: PageOptions::default(),
        }
    }
}

impl ForgeConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ForgeError> {
        let text = fs::read_to_string(path).map_err(|e| ForgeError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|reason| ForgeError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Build the converter selected by `backend`.
    pub fn converter(&self) -> Box<dyn PdfConverter> {
        match self.backend {
            Backend::Wkhtmltopdf => Box::new(
                WkhtmltopdfConverter::from_env(self.wkhtmltopdf_path.as_deref())
                    .with_timeout(self.timeout()),
            ),
            Backend::Native => Box::new(NativeConverter::new()),
        }
    }
}
