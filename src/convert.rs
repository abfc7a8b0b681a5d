//! Document converter – the seam between rendered HTML and PDF bytes.
//!
//! Two backends implement [`PdfConverter`]:
//! - [`WkhtmltopdfConverter`](crate::wkhtmltopdf::WkhtmltopdfConverter) shells
//!   out to the external `wkhtmltopdf` executable (the default).
//! - [`NativeConverter`](crate::render::NativeConverter) lays out the text
//!   content in-process with `printpdf`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Converter failures. Always scoped to a single record.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("wkhtmltopdf not found (searched: {})", format_searched(.searched))]
    Unavailable { searched: Vec<PathBuf> },

    #[error("failed to start '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("converter exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("converter did not finish within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("converter produced no output")]
    EmptyOutput,

    #[error("converter I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "nothing".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Turns one rendered HTML document into PDF bytes.
pub trait PdfConverter {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn render_pdf(&self, html: &str, options: &PageOptions) -> Result<Vec<u8>, ConvertError>;
}

/// Physical page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// US Letter, 8.5 × 11 in.
    #[default]
    Letter,
    /// US Legal, 8.5 × 14 in.
    Legal,
    /// ISO A4, 210 × 297 mm.
    A4,
}

impl PageSize {
    /// Portrait width and height in points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A4 => (595.28, 841.89),
        }
    }

    /// Name understood by `wkhtmltopdf --page-size`.
    pub fn wkhtmltopdf_name(self) -> &'static str {
        match self {
            PageSize::Letter => "Letter",
            PageSize::Legal => "Legal",
            PageSize::A4 => "A4",
        }
    }
}

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page and input settings handed to every conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    pub size: PageSize,
    pub orientation: PageOrientation,
    /// Margin on all four sides, in inches.
    pub margin_in: f32,
    pub encoding: String,
    /// Let the backend load local images and fonts referenced by the HTML.
    pub enable_local_file_access: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            size: PageSize::Letter,
            orientation: PageOrientation::Portrait,
            margin_in: 0.0,
            encoding: "UTF-8".to_string(),
            enable_local_file_access: true,
        }
    }
}

impl PageOptions {
    /// Page width and height in points after applying orientation.
    pub fn effective_size_pt(&self) -> (f32, f32) {
        let (w, h) = self.size.dimensions_pt();
        match self.orientation {
            PageOrientation::Portrait => (w, h),
            PageOrientation::Landscape => (h, w),
        }
    }

    pub fn margin_pt(&self) -> f32 {
        self.margin_in * 72.0
    }
}
