//! # cert-forge – batch PDF certificates from an attendee table
//!
//! The pipeline stages are:
//!
//! 1. **Load** – attendee CSV → validated [`AttendeeBatch`] ([`records`])
//! 2. **Render** – bind each record into an HTML template ([`template`])
//! 3. **Convert** – HTML → PDF bytes through a [`PdfConverter`] ([`convert`],
//!    with the [`wkhtmltopdf`] and native [`render`] backends)
//! 4. **Place** – sanitized file names in a per-event directory ([`output`],
//!    [`sanitize`])
//!
//! [`pipeline::generate`] runs the whole batch and isolates per-record
//! failures.

pub mod config;
pub mod convert;
pub mod dom;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod samples;
pub mod sanitize;
pub mod template;
pub mod wkhtmltopdf;

// Re-exports for convenience
pub use config::{Backend, ForgeConfig};
pub use convert::{ConvertError, PageOptions, PdfConverter};
pub use error::ForgeError;
pub use output::OutputDir;
pub use pipeline::{generate, GenerateRequest, GenerationResult};
pub use records::{AttendeeBatch, AttendeeRecord};
pub use sanitize::sanitize;
