//! Test utilities for the html-validation crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests or
//! with the `test-support` feature.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::HtmlValidationSettings;
use crate::domain::ports::{HtmlValidator, HtmlValidatorError, JobDispatchError, ValidationQueue};
use crate::domain::report::DEFAULT_REPORT_DIR;
use crate::domain::{ReportLayout, ValidationJob, ValidationReport};

pub mod cap_fs {
    //! Capability-safe filesystem helpers for tests.
    //!
    //! The crate avoids direct `std::fs` calls. These helpers provide common
    //! read/write/existence/listing operations built on `cap_std::fs::Dir` so
    //! test suites can share consistent, policy-compliant file access.

    use std::ffi::OsString;
    use std::io;
    use std::path::Path;

    use cap_std::{ambient_authority, fs::Dir};

    /// Read a UTF-8 text file through `cap_std`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use html_validation::test_support::cap_fs::{read_file_to_string, write_file};
    ///
    /// let path = std::env::temp_dir().join("html-validation-read-example.txt");
    /// write_file(&path, b"hello\n")?;
    ///
    /// let content = read_file_to_string(&path)?;
    /// assert_eq!(content, "hello\n");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn read_file_to_string(path: &Path) -> io::Result<String> {
        let (parent, file_name) = parent_and_file_name(path)?;
        let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
        directory.read_to_string(Path::new(&file_name))
    }

    /// Write bytes to a file through `cap_std`.
    pub fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
        let (parent, file_name) = parent_and_file_name(path)?;
        let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
        directory.write(Path::new(&file_name), contents)
    }

    /// Return true when `path` exists, false when it does not.
    pub fn path_exists(path: &Path) -> bool {
        let Ok((parent, file_name)) = parent_and_file_name(path) else {
            return false;
        };
        let Ok(directory) = Dir::open_ambient_dir(parent, ambient_authority()) else {
            return false;
        };
        directory.exists(Path::new(&file_name))
    }

    /// Return the sorted entry names of a directory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use html_validation::test_support::cap_fs::{list_file_names, write_file};
    ///
    /// let dir = tempfile::tempdir()?;
    /// write_file(&dir.path().join("b.html"), b"")?;
    /// write_file(&dir.path().join("a.html"), b"")?;
    /// assert_eq!(list_file_names(dir.path())?, vec!["a.html", "b.html"]);
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn list_file_names(path: &Path) -> io::Result<Vec<String>> {
        let directory = Dir::open_ambient_dir(path, ambient_authority())?;
        let mut names = Vec::new();
        for entry in directory.entries()? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn parent_and_file_name(path: &Path) -> io::Result<(&Path, OsString)> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "path must include a file or directory name",
            )
        })?;
        Ok((parent, file_name.to_os_string()))
    }
}

/// Marker that makes [`ScriptedHtmlValidator`] report errors.
pub const INVALID_MARKER: &str = "asdfghjkl";

/// Validator double that reads the saved page and reports one error per
/// line containing [`INVALID_MARKER`].
///
/// Diagnostics use the `<path>:<line>: error: ...` shape of GNU-style
/// validator output; clean pages report `All good.`.
#[derive(Debug, Default)]
pub struct ScriptedHtmlValidator {
    failure: Option<HtmlValidatorError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedHtmlValidator {
    /// Validator that always fails with `error`.
    #[must_use]
    pub fn failing(error: HtmlValidatorError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Wait `delay` before reading the page, widening the window in which a
    /// concurrent job could overwrite it.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of pages validated so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HtmlValidator for ScriptedHtmlValidator {
    async fn validate(&self, page: &Path) -> Result<ValidationReport, HtmlValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let contents = cap_fs::read_file_to_string(page)
            .map_err(|error| HtmlValidatorError::failed(error.to_string()))?;
        let diagnostics: Vec<String> = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains(INVALID_MARKER))
            .map(|(index, _)| {
                format!(
                    "{}:{}: error: Element \"{INVALID_MARKER}\" not allowed here.",
                    page.display(),
                    index + 1
                )
            })
            .collect();
        if diagnostics.is_empty() {
            return Ok(ValidationReport::new(0, vec!["All good.".to_owned()]));
        }
        Ok(ValidationReport::new(diagnostics.len(), diagnostics))
    }
}

/// Queue double that keeps every accepted job.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<ValidationJob>>,
}

impl RecordingQueue {
    /// Jobs accepted so far, in submission order.
    pub fn jobs(&self) -> Vec<ValidationJob> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ValidationQueue for RecordingQueue {
    async fn enqueue(&self, job: ValidationJob) -> Result<(), JobDispatchError> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| JobDispatchError::unavailable("recording queue poisoned"))?;
        jobs.push(job);
        Ok(())
    }
}

/// Inline settings writing reports to `output_dir`, everything else default.
#[must_use]
pub fn settings_for(output_dir: impl Into<PathBuf>) -> HtmlValidationSettings {
    HtmlValidationSettings {
        output_dir: Some(output_dir.into()),
        background: false,
        unique_names: false,
        validator_command: None,
        validator_args: None,
        ignore: None,
        timeout_seconds: None,
        queue_capacity: None,
        workers: None,
        max_body_bytes: None,
    }
}

/// Report directory inside a temporary root that is removed on drop.
///
/// # Examples
///
/// ```rust
/// use html_validation::test_support::TempReportDir;
///
/// let reports = TempReportDir::new()?;
/// let layout = reports.prepared_layout()?;
/// assert!(layout.html_dir().starts_with(reports.output_dir()));
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct TempReportDir {
    _root: tempfile::TempDir,
    output_dir: PathBuf,
}

impl TempReportDir {
    /// Create a fresh temporary root. The report directory itself is not
    /// created until a layout is prepared.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let root = tempfile::tempdir()?;
        let output_dir = root.path().join(DEFAULT_REPORT_DIR);
        Ok(Self {
            _root: root,
            output_dir,
        })
    }

    /// Report directory path.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Inline settings pointing at this report directory.
    #[must_use]
    pub fn settings(&self) -> HtmlValidationSettings {
        settings_for(self.output_dir.clone())
    }

    /// Layout for this report directory with its directories created.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the directories cannot be created.
    pub fn prepared_layout(&self) -> io::Result<ReportLayout> {
        let layout = ReportLayout::new(self.output_dir.clone());
        layout.prepare()?;
        Ok(layout)
    }
}
