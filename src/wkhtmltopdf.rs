//! External `wkhtmltopdf` backend.
//!
//! The HTML is piped on stdin and the PDF read back from stdout, so no
//! temporary files are involved. Relative resource paths in the template
//! resolve against the current working directory.
//!
//! Executable lookup order:
//! 1. explicit path (config file / `--wkhtmltopdf`)
//! 2. `WKHTMLTOPDF_PATH`
//! 3. every directory on `PATH`
//! 4. well-known install locations

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::convert::{ConvertError, PageOptions, PageOrientation, PdfConverter};

/// Environment variable naming the converter executable.
pub const PATH_ENV: &str = "WKHTMLTOPDF_PATH";

#[cfg(windows)]
const EXE_NAME: &str = "wkhtmltopdf.exe";
#[cfg(not(windows))]
const EXE_NAME: &str = "wkhtmltopdf";

const WELL_KNOWN: &[&str] = &[
    "/usr/local/bin/wkhtmltopdf",
    "/usr/bin/wkhtmltopdf",
    "/opt/homebrew/bin/wkhtmltopdf",
    r"C:\Program Files\wkhtmltopdf\bin\wkhtmltopdf.exe",
];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Outcome of executable lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    NotFound { searched: Vec<PathBuf> },
}

/// Resolve the executable from explicit inputs.
///
/// `env_value` and `path_var` are the values of `WKHTMLTOPDF_PATH` and
/// `PATH`; they are parameters so lookup can be tested without touching the
/// process environment. An explicit or env path that does not exist is
/// recorded as searched and lookup continues.
pub fn resolve_executable(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    path_var: Option<OsString>,
) -> Resolution {
    let mut searched = Vec::new();

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(p) = explicit {
        candidates.push(p.to_path_buf());
    }
    if let Some(v) = env_value.filter(|v| !v.is_empty()) {
        candidates.push(PathBuf::from(v));
    }
    if let Some(paths) = path_var {
        candidates.extend(std::env::split_paths(&paths).map(|dir| dir.join(EXE_NAME)));
    }
    candidates.extend(WELL_KNOWN.iter().map(PathBuf::from));

    for candidate in candidates {
        if candidate.is_file() {
            return Resolution::Found(candidate);
        }
        if !searched.contains(&candidate) {
            searched.push(candidate);
        }
    }
    Resolution::NotFound { searched }
}

/// Converter that runs `wkhtmltopdf` once per document.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfConverter {
    resolution: Resolution,
    timeout: Option<Duration>,
}

impl WkhtmltopdfConverter {
    /// Look the executable up using the process environment.
    pub fn from_env(explicit: Option<&Path>) -> Self {
        let resolution = resolve_executable(
            explicit,
            std::env::var_os(PATH_ENV),
            std::env::var_os("PATH"),
        );
        match &resolution {
            Resolution::Found(p) => log::debug!("using wkhtmltopdf at {}", p.display()),
            Resolution::NotFound { .. } => log::warn!("wkhtmltopdf executable not found"),
        }
        Self {
            resolution,
            timeout: None,
        }
    }

    pub fn with_resolution(resolution: Resolution) -> Self {
        Self {
            resolution,
            timeout: None,
        }
    }

    /// Kill the converter and fail the record if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> Option<&Path> {
        match &self.resolution {
            Resolution::Found(p) => Some(p),
            Resolution::NotFound { .. } => None,
        }
    }
}

/// Command-line arguments for one conversion, reading stdin and writing stdout.
pub fn build_args(options: &PageOptions) -> Vec<String> {
    let margin = format!("{}in", options.margin_in);
    let mut args = vec![
        "--quiet".to_string(),
        "--page-size".to_string(),
        options.size.wkhtmltopdf_name().to_string(),
        "--orientation".to_string(),
        match options.orientation {
            PageOrientation::Portrait => "Portrait",
            PageOrientation::Landscape => "Landscape",
        }
        .to_string(),
    ];
    for side in ["top", "right", "bottom", "left"] {
        args.push(format!("--margin-{side}"));
        args.push(margin.clone());
    }
    args.push("--encoding".to_string());
    args.push(options.encoding.clone());
    if options.enable_local_file_access {
        args.push("--enable-local-file-access".to_string());
    }
    args.push("-".to_string());
    args.push("-".to_string());
    args
}

impl PdfConverter for WkhtmltopdfConverter {
    fn name(&self) -> &str {
        "wkhtmltopdf"
    }

    fn render_pdf(&self, html: &str, options: &PageOptions) -> Result<Vec<u8>, ConvertError> {
        let program = match &self.resolution {
            Resolution::Found(p) => p,
            Resolution::NotFound { searched } => {
                return Err(ConvertError::Unavailable {
                    searched: searched.clone(),
                })
            }
        };

        let args = build_args(options);
        log::debug!("{} {}", program.display(), args.join(" "));

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ConvertError::Spawn {
                program: program.clone(),
                source,
            })?;

        run_child(child, html.as_bytes().to_vec(), self.timeout)
    }
}

/// Feed `input` to the child and collect stdout, killing it on timeout.
fn run_child(
    mut child: Child,
    input: Vec<u8>,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ConvertError> {
    let stdin = child.stdin.take();
    let writer = thread::spawn(move || -> std::io::Result<()> {
        if let Some(mut stdin) = stdin {
            stdin.write_all(&input)?;
        }
        Ok(())
    });
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ConvertError::TimedOut(limit));
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_reader(stdout_reader)?;
    let stderr = join_reader(stderr_reader)?;
    // A broken pipe here means the child exited early; its status says why.
    let _ = writer.join();

    if !status.success() {
        return Err(ConvertError::Exited {
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    if stdout.is_empty() {
        return Err(ConvertError::EmptyOutput);
    }
    Ok(stdout)
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ConvertError> {
    match handle.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(ConvertError::Render("pipe reader thread panicked".into())),
    }
}
