//! Pipeline – ties together loading, templating, conversion, and placement
//! into a single batch run.
//!
//! Pre-flight work (table, template, output directory) happens once and any
//! failure there aborts the run before a single certificate is attempted.
//! After that, each record runs `render → convert → write` on its own; a
//! failure marks that record and the batch moves on.

use std::path::PathBuf;

use crate::config::ForgeConfig;
use crate::convert::{PageOptions, PdfConverter};
use crate::error::{ForgeError, RecordCause, RecordStage};
use crate::output::{resolve_dir, OutputDir, OutputPlacer};
use crate::records::{load_batch, AttendeeRecord};
use crate::template::CertificateTemplate;

/// Default attendee table path.
pub const DEFAULT_CSV: &str = "attendees.csv";
/// Default template path.
pub const DEFAULT_TEMPLATE: &str = "cert_template.html";

/// Inputs for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub csv: PathBuf,
    pub template: PathBuf,
    pub output: OutputDir,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            csv: PathBuf::from(DEFAULT_CSV),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output: OutputDir::AutoDerive,
        }
    }
}

/// Where a record got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Rendered,
    Converted,
    Written,
    Failed(RecordStage),
}

/// Final state of one record.
#[derive(Debug)]
pub struct RecordOutcome {
    pub row: usize,
    pub attendee: String,
    pub state: RecordState,
    /// The written file, or the record's [`ForgeError::RecordRender`].
    pub result: Result<PathBuf, ForgeError>,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RecordState::Written
    }
}

/// Tally of a completed batch.
#[derive(Debug)]
pub struct GenerationResult {
    pub output_dir: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl GenerationResult {
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    /// A batch succeeds when at least one certificate was written.
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }
}

/// Run a full batch.
pub fn generate(
    request: &GenerateRequest,
    config: &ForgeConfig,
    converter: &dyn PdfConverter,
) -> Result<GenerationResult, ForgeError> {
    generate_with(request, config, converter, |_| {})
}

/// Like [`generate`], calling `on_record` as soon as each record settles.
pub fn generate_with<F>(
    request: &GenerateRequest,
    config: &ForgeConfig,
    converter: &dyn PdfConverter,
    mut on_record: F,
) -> Result<GenerationResult, ForgeError>
where
    F: FnMut(&RecordOutcome),
{
    // 1. Load and validate the table
    let batch = load_batch(&request.csv)?;
    log::info!(
        "read {} attendees from {}",
        batch.len(),
        request.csv.display()
    );

    // 2. Load the template
    let template = CertificateTemplate::load(&request.template)?;
    log::info!("using template {}", template.path().display());

    // 3. Resolve and create the output directory
    let dir = resolve_dir(&request.output, &batch, &config.output_root);
    let mut placer = OutputPlacer::create(dir)?;
    log::info!(
        "output directory {} (converter: {})",
        placer.dir().display(),
        converter.name()
    );

    // 4. One certificate per record
    let mut outcomes = Vec::with_capacity(batch.len());
    for record in batch.records() {
        let outcome = process_record(record, &template, converter, &config.page, &mut placer);
        on_record(&outcome);
        outcomes.push(outcome);
    }

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let result = GenerationResult {
        output_dir: placer.dir().to_path_buf(),
        total: outcomes.len(),
        succeeded,
        outcomes,
    };
    log::info!(
        "generated {}/{} certificates in {}",
        result.succeeded,
        result.total,
        result.output_dir.display()
    );
    Ok(result)
}

fn process_record(
    record: &AttendeeRecord,
    template: &CertificateTemplate,
    converter: &dyn PdfConverter,
    options: &PageOptions,
    placer: &mut OutputPlacer,
) -> RecordOutcome {
    let attendee = record.display_name();
    let mut state = RecordState::Pending;
    let result = run_record(record, template, converter, options, placer, &mut state)
        .map_err(|(stage, source)| {
            state = RecordState::Failed(stage);
            ForgeError::RecordRender {
                attendee: attendee.clone(),
                stage,
                source,
            }
        });

    match &result {
        Ok(path) => log::debug!("{attendee}: written to {}", path.display()),
        Err(e) => log::warn!("{e}"),
    }

    RecordOutcome {
        row: record.row(),
        attendee,
        state,
        result,
    }
}

fn run_record(
    record: &AttendeeRecord,
    template: &CertificateTemplate,
    converter: &dyn PdfConverter,
    options: &PageOptions,
    placer: &mut OutputPlacer,
    state: &mut RecordState,
) -> Result<PathBuf, (RecordStage, RecordCause)> {
    let html = template
        .render(record)
        .map_err(|e| (RecordStage::Render, RecordCause::from(e)))?;
    advance(state, RecordState::Rendered, record);

    let pdf = converter
        .render_pdf(&html, options)
        .map_err(|e| (RecordStage::Convert, RecordCause::from(e)))?;
    advance(state, RecordState::Converted, record);

    let path = placer
        .write(record, &pdf)
        .map_err(|e| (RecordStage::Write, RecordCause::from(e)))?;
    advance(state, RecordState::Written, record);

    Ok(path)
}

fn advance(state: &mut RecordState, next: RecordState, record: &AttendeeRecord) {
    log::debug!("row {}: {:?} -> {:?}", record.row(), state, next);
    *state = next;
}
