//! Report directory layout and validation results.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};

use super::PageSlug;

/// Report directory used when none is configured.
pub const DEFAULT_REPORT_DIR: &str = "html_validation";
/// Sub-directory holding the pages that failed validation.
pub const HTML_DIR_NAME: &str = "html";
/// Aggregate validator log inside the report directory.
pub const ERRORS_FILE_NAME: &str = "errors.txt";

/// Where saved pages and the aggregate error log live.
///
/// # Examples
/// ```
/// use std::path::Path;
///
/// use html_validation::domain::ReportLayout;
///
/// let layout = ReportLayout::new("reports/html");
/// assert_eq!(layout.html_dir(), Path::new("reports/html/html"));
/// assert_eq!(layout.errors_file(), Path::new("reports/html/errors.txt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    report_dir: PathBuf,
    html_dir: PathBuf,
    errors_file: PathBuf,
}

impl ReportLayout {
    /// Derive the layout rooted at `report_dir`.
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        let report_dir = report_dir.into();
        let html_dir = report_dir.join(HTML_DIR_NAME);
        let errors_file = report_dir.join(ERRORS_FILE_NAME);
        Self {
            report_dir,
            html_dir,
            errors_file,
        }
    }

    /// Create the report and HTML directories when missing.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when a directory cannot be created.
    pub fn prepare(&self) -> io::Result<()> {
        Dir::create_ambient_dir_all(&self.html_dir, ambient_authority())
    }

    /// Root report directory.
    #[must_use]
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Directory holding saved pages.
    #[must_use]
    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    /// Aggregate error log.
    #[must_use]
    pub fn errors_file(&self) -> &Path {
        &self.errors_file
    }

    /// Path at which the page for `slug` is stored.
    #[must_use]
    pub fn page_path(&self, slug: &PageSlug) -> PathBuf {
        self.html_dir.join(slug.file_name())
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_DIR)
    }
}

/// Result reported by the external validator for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Number of errors the validator found.
    pub error_count: usize,
    /// Human-readable diagnostics, one per line, as the validator wrote them.
    pub diagnostics: Vec<String>,
}

impl ValidationReport {
    /// Build a report from its parts.
    #[must_use]
    pub fn new(error_count: usize, diagnostics: Vec<String>) -> Self {
        Self {
            error_count,
            diagnostics,
        }
    }

    /// Return `true` when the validator found no errors.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

/// What happened to a page after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The page validated cleanly and its file was removed.
    Passed,
    /// The page had errors and its file was kept for inspection.
    Failed {
        /// Location of the retained page.
        page_path: PathBuf,
        /// Number of errors the validator reported.
        error_count: usize,
    },
}

impl ValidationOutcome {
    /// Return `true` when the page was valid.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}
