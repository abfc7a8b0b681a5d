//! Integration tests for the certificate pipeline.
//!
//! These tests validate:
//! - One valid PDF per attendee, named and placed as documented
//! - Batch-fatal errors abort before anything is written
//! - Per-record failures leave the rest of the batch intact
//! - Duplicate file names overwrite (last write wins)

use std::fs;
use std::path::{Path, PathBuf};

use cert_forge::config::{Backend, ForgeConfig};
use cert_forge::convert::{ConvertError, PageOptions, PdfConverter};
use cert_forge::error::{ForgeError, RecordStage};
use cert_forge::output::OutputDir;
use cert_forge::pipeline::{generate, GenerateRequest, RecordState};
use cert_forge::render::NativeConverter;
use cert_forge::samples;
use cert_forge::wkhtmltopdf::{Resolution, WkhtmltopdfConverter};

// =====================================================================
// Helpers
// =====================================================================

const HEADER: &str = "FirstName,LastName,EmailAddress,EventTitle,EventDate";

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn native_config(root: &Path) -> ForgeConfig {
    ForgeConfig {
        backend: Backend::Native,
        output_root: root.join("output"),
        ..ForgeConfig::default()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    request: GenerateRequest,
}

fn fixture(csv: &str, template: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let csv_path = root.join("attendees.csv");
    let template_path = root.join("cert_template.html");
    fs::write(&csv_path, csv).unwrap();
    fs::write(&template_path, template).unwrap();
    Fixture {
        _dir: dir,
        root,
        request: GenerateRequest {
            csv: csv_path,
            template: template_path,
            output: OutputDir::AutoDerive,
        },
    }
}

fn pdf_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".pdf"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// =====================================================================
// End-to-end with the native backend
// =====================================================================

#[test]
fn documented_example_layout() {
    let csv = format!("{HEADER}\nAna,Lee,ana@example.com,Intro to X,2024-01-05\n");
    let fx = fixture(&csv, "<h1>{{ FirstName }} {{ LastName }}</h1>");
    let config = native_config(&fx.root);

    let result = generate(&fx.request, &config, &NativeConverter::new()).unwrap();

    let expected_dir = fx.root.join("output").join("Intro_to_X_2024_01_05");
    assert_eq!(result.output_dir, expected_dir);
    assert_eq!((result.succeeded, result.total), (1, 1));
    let file = expected_dir.join("Lee-Ana-Intro_to_X-2024_01_05.pdf");
    assert_valid_pdf(&fs::read(file).unwrap());
}

#[test]
fn sample_batch_produces_one_pdf_per_attendee() {
    let fx = fixture(samples::attendees_csv(), samples::certificate_template());
    let config = native_config(&fx.root);

    let result = generate(&fx.request, &config, &NativeConverter::new()).unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 3);
    assert!(result.is_success());
    let files = pdf_files(&result.output_dir);
    assert_eq!(files.len(), 3);
    assert!(files.contains(&"Lee-Ana-Intro_to_X-2024_01_05.pdf".to_string()));
    assert!(files.contains(&"D_az-Bruno-Intro_to_X-2024_01_05.pdf".to_string()));
    assert!(files.contains(&"O_Neil-Chlo_-Intro_to_X-2024_01_05.pdf".to_string()));
    for name in files {
        assert_valid_pdf(&fs::read(result.output_dir.join(name)).unwrap());
    }
}

#[test]
fn explicit_output_dir_is_created() {
    let csv = format!("{HEADER}\nAna,Lee,a@x,Talk,2024-01-05\nBo,Kim,b@x,Talk,2024-01-05\n");
    let mut fx = fixture(&csv, "<p>{{ FirstName }}</p>");
    let target = fx.root.join("nested/certs");
    fx.request.output = OutputDir::Explicit(target.clone());

    let result = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap();

    assert_eq!(result.output_dir, target);
    assert_eq!(pdf_files(&target).len(), 2);
    assert!(!fx.root.join("output").exists());
}

#[test]
fn existing_output_dir_is_reused() {
    let csv = format!("{HEADER}\nAna,Lee,a@x,Talk,2024-01-05\n");
    let fx = fixture(&csv, "<p>{{ FirstName }}</p>");
    let config = native_config(&fx.root);
    generate(&fx.request, &config, &NativeConverter::new()).unwrap();
    let again = generate(&fx.request, &config, &NativeConverter::new()).unwrap();
    assert_eq!(again.succeeded, 1);
    assert_eq!(pdf_files(&again.output_dir).len(), 1);
}

// =====================================================================
// Batch-fatal errors
// =====================================================================

#[test]
fn missing_column_writes_nothing() {
    let csv = "FirstName,LastName,EmailAddress,EventTitle\nAna,Lee,a@x,Talk\n";
    let fx = fixture(csv, "<p>{{ FirstName }}</p>");
    let err = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap_err();
    match err {
        ForgeError::Schema { missing, .. } => assert_eq!(missing, vec!["EventDate"]),
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(!fx.root.join("output").exists());
}

#[test]
fn header_only_table_is_empty_input() {
    let fx = fixture(&format!("{HEADER}\n"), "<p>{{ FirstName }}</p>");
    let err = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap_err();
    assert!(matches!(err, ForgeError::EmptyInput { .. }));
    assert!(err.is_fatal());
}

#[test]
fn missing_csv_is_source_read_error() {
    let mut fx = fixture(&format!("{HEADER}\n"), "x");
    fx.request.csv = fx.root.join("nope.csv");
    let err = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap_err();
    assert!(matches!(err, ForgeError::SourceRead { .. }));
}

#[test]
fn missing_template_is_template_load_error() {
    let csv = format!("{HEADER}\nAna,Lee,a@x,Talk,2024-01-05\n");
    let mut fx = fixture(&csv, "x");
    fx.request.template = fx.root.join("missing.html");
    let err = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap_err();
    assert!(matches!(err, ForgeError::TemplateLoad { .. }));
    assert!(!fx.root.join("output").exists());
}

// =====================================================================
// Per-record failures
// =====================================================================

#[test]
fn malformed_record_yields_n_minus_one_files() {
    let csv = format!(
        "{HEADER}\n\
         Ana,Lee,a@x,Talk,2024-01-05\n\
         Bo,Kim,b@x,Talk,someday\n\
         Cy,Park,c@x,Talk,2024-01-06\n"
    );
    let mut fx = fixture(
        &csv,
        r#"<p>{{ FirstName }} on {{ EventDate | date(format="%B %d, %Y") }}</p>"#,
    );
    fx.request.output = OutputDir::Explicit(fx.root.join("out"));

    let result = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap();

    assert_eq!((result.succeeded, result.total), (2, 3));
    assert_eq!(pdf_files(&fx.root.join("out")).len(), 2);
    let failed = &result.outcomes[1];
    assert_eq!(failed.state, RecordState::Failed(RecordStage::Render));
    let message = failed.result.as_ref().unwrap_err().to_string();
    assert!(message.contains("Bo Kim"), "{message}");
}

#[test]
fn unavailable_converter_fails_records_not_batch() {
    let csv = format!("{HEADER}\nAna,Lee,a@x,Talk,2024-01-05\nBo,Kim,b@x,Talk,2024-01-05\n");
    let fx = fixture(&csv, "<p>{{ FirstName }}</p>");
    let converter = WkhtmltopdfConverter::with_resolution(Resolution::NotFound {
        searched: vec![PathBuf::from("/missing/wkhtmltopdf")],
    });

    let config = ForgeConfig {
        output_root: fx.root.join("output"),
        ..ForgeConfig::default()
    };

    let result = generate(&fx.request, &config, &converter).unwrap();

    assert_eq!(result.succeeded, 0);
    assert!(!result.is_success());
    for outcome in &result.outcomes {
        assert_eq!(outcome.state, RecordState::Failed(RecordStage::Convert));
        let err = outcome.result.as_ref().unwrap_err();
        assert!(err.to_string().contains("wkhtmltopdf not found"), "{err}");
    }
    assert!(pdf_files(&result.output_dir).is_empty());
}

#[cfg(unix)]
#[test]
fn failing_external_converter_fails_only_that_record() {
    use std::os::unix::fs::PermissionsExt;

    let csv = format!(
        "{HEADER}\n\
         Ana,Lee,a@x,Talk,2024-01-05\n\
         FAIL,Kim,b@x,Talk,2024-01-05\n\
         Cy,Park,c@x,Talk,2024-01-05\n"
    );
    let mut fx = fixture(&csv, "<p>{{ FirstName }}</p>");
    fx.request.output = OutputDir::Explicit(fx.root.join("out"));
    let exe = fx.root.join("wkhtmltopdf");
    fs::write(
        &exe,
        "#!/bin/sh\n\
         input=$(cat)\n\
         case \"$input\" in *FAIL*) echo 'cannot render page' >&2; exit 1;; esac\n\
         printf '%%PDF-1.4 %s' \"$input\"\n",
    )
    .unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    let converter = WkhtmltopdfConverter::with_resolution(Resolution::Found(exe));

    let result = generate(&fx.request, &native_config(&fx.root), &converter).unwrap();

    assert_eq!((result.succeeded, result.total), (2, 3));
    assert_eq!(
        pdf_files(&fx.root.join("out")),
        vec!["Lee-Ana-Talk-2024_01_05.pdf", "Park-Cy-Talk-2024_01_05.pdf"]
    );
    let failed = &result.outcomes[1];
    assert_eq!(failed.state, RecordState::Failed(RecordStage::Convert));
    let message = failed.result.as_ref().unwrap_err().to_string();
    assert!(message.contains("FAIL Kim"), "{message}");
    assert!(message.contains("cannot render page"), "{message}");
}

#[test]
fn odd_style_values_do_not_abort_native_batch() {
    let csv = "FirstName,LastName,EmailAddress,EventTitle,EventDate,Color\n\
               Ana,Lee,a@x,Talk,2024-01-05,#1a365d\n\
               Bo,Kim,b@x,Talk,2024-01-05,#aééb\n\
               Cy,Park,c@x,Talk,2024-01-05,#zzz\n";
    let mut fx = fixture(csv, r#"<p style="color: {{ Color }}">{{ FirstName }}</p>"#);
    fx.request.output = OutputDir::Explicit(fx.root.join("out"));

    let result = generate(&fx.request, &native_config(&fx.root), &NativeConverter::new()).unwrap();

    assert_eq!((result.succeeded, result.total), (3, 3));
    for name in pdf_files(&fx.root.join("out")) {
        assert_valid_pdf(&fs::read(fx.root.join("out").join(name)).unwrap());
    }
}

#[test]
fn case_punctuation_collision_last_write_wins() {
    let csv = format!(
        "{HEADER}\n\
         Ana,Lee,a@x,Intro to X,2024-01-05\n\
         Ana,Lee,second@x,Intro -to- X,2024/01/05\n"
    );
    let mut fx = fixture(&csv, "{{ EmailAddress }}");
    fx.request.output = OutputDir::Explicit(fx.root.join("out"));

    let result = generate(&fx.request, &native_config(&fx.root), &RecordingConverter).unwrap();

    assert_eq!((result.succeeded, result.total), (2, 2));
    let files = pdf_files(&fx.root.join("out"));
    assert_eq!(files, vec!["Lee-Ana-Intro_to_X-2024_01_05.pdf"]);
    let collided = fx.root.join("out").join(&files[0]);
    assert_eq!(fs::read_to_string(collided).unwrap(), "%PDF-second@x");
}

#[test]
fn exact_duplicates_leave_one_file() {
    let csv = format!(
        "{HEADER}\n\
         Ana,Lee,first@x,Talk,2024-01-05\n\
         Ana,Lee,second@x,Talk,2024-01-05\n"
    );
    let mut fx = fixture(&csv, "{{ EmailAddress }}");
    fx.request.output = OutputDir::Explicit(fx.root.join("out"));

    let result = generate(&fx.request, &native_config(&fx.root), &RecordingConverter).unwrap();

    assert_eq!((result.succeeded, result.total), (2, 2));
    let files = pdf_files(&fx.root.join("out"));
    assert_eq!(files, vec!["Lee-Ana-Talk-2024_01_05.pdf"]);
    let contents = fs::read_to_string(fx.root.join("out").join(&files[0])).unwrap();
    assert_eq!(contents, "%PDF-second@x");
}

/// Echoes the rendered HTML behind a PDF magic so tests can see which
/// record produced a file.
struct RecordingConverter;

impl PdfConverter for RecordingConverter {
    fn name(&self) -> &str {
        "recording"
    }

    fn render_pdf(&self, html: &str, _: &PageOptions) -> Result<Vec<u8>, ConvertError> {
        Ok(format!("%PDF-{html}").into_bytes())
    }
}
