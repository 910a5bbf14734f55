//! Capability-scoped filesystem adapters for saved pages and the error log.
//!
//! Both adapters open their directory once through `cap_std` and never touch
//! paths outside it. Blocking writes run on Tokio's blocking pool so the
//! Actix worker that triggered them is not stalled.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cap_std::fs::{Dir, File, OpenOptions};
use cap_std::ambient_authority;

use crate::domain::PageSlug;
use crate::domain::ReportLayout;
use crate::domain::ports::{DiagnosticsSink, DiagnosticsSinkError, PageStore, PageStoreError};
use crate::domain::report::ERRORS_FILE_NAME;

/// [`PageStore`] writing `<slug>.html` files into the report's HTML directory.
#[derive(Debug, Clone)]
pub struct CapStdPageStore {
    dir: Arc<Dir>,
    html_dir: PathBuf,
}

impl CapStdPageStore {
    /// Open the HTML directory of `layout`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the directory does not exist or cannot be
    /// opened. Call [`ReportLayout::prepare`] first.
    pub fn open(layout: &ReportLayout) -> io::Result<Self> {
        let dir = Dir::open_ambient_dir(layout.html_dir(), ambient_authority())?;
        Ok(Self {
            dir: Arc::new(dir),
            html_dir: layout.html_dir().to_path_buf(),
        })
    }
}

#[async_trait]
impl PageStore for CapStdPageStore {
    async fn save(&self, slug: &PageSlug, body: &[u8]) -> Result<PathBuf, PageStoreError> {
        let file_name = slug.file_name();
        let path = self.html_dir.join(&file_name);
        let dir = Arc::clone(&self.dir);
        let body = body.to_vec();
        tokio::task::spawn_blocking(move || dir.write(&file_name, &body))
            .await
            .map_err(|error| PageStoreError::write(path.clone(), error.to_string()))?
            .map_err(|error| PageStoreError::write(path.clone(), error.to_string()))?;
        Ok(path)
    }

    async fn discard(&self, slug: &PageSlug) -> Result<(), PageStoreError> {
        let file_name = slug.file_name();
        let path = self.html_dir.join(&file_name);
        let dir = Arc::clone(&self.dir);
        let removed = tokio::task::spawn_blocking(move || dir.remove_file(&file_name))
            .await
            .map_err(|error| PageStoreError::remove(path.clone(), error.to_string()))?;
        match removed {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(PageStoreError::remove(path, error.to_string())),
        }
    }
}

/// [`DiagnosticsSink`] appending to `<report_dir>/errors.txt`.
///
/// The file is created when the sink is opened so that it exists, empty,
/// before the first HTML response is seen.
#[derive(Debug, Clone)]
pub struct ErrorLogFile {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl ErrorLogFile {
    /// Open (creating if needed) the error log of `layout` in append mode.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the report directory or log cannot be
    /// opened.
    pub fn open(layout: &ReportLayout) -> io::Result<Self> {
        let dir = Dir::open_ambient_dir(layout.report_dir(), ambient_authority())?;
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        let file = dir.open_with(ERRORS_FILE_NAME, &options)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: layout.errors_file().to_path_buf(),
        })
    }

    /// Location of the log.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl DiagnosticsSink for ErrorLogFile {
    async fn record(&self, lines: &[String]) -> Result<(), DiagnosticsSinkError> {
        if lines.is_empty() {
            return Ok(());
        }
        let mut text = lines.join("\n");
        text.push('\n');
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut guard = file
                .lock()
                .map_err(|_| io::Error::other("error log lock poisoned"))?;
            guard.write_all(text.as_bytes())?;
            guard.flush()
        })
        .await
        .map_err(|error| DiagnosticsSinkError::append(error.to_string()))?
        .map_err(|error| {
            DiagnosticsSinkError::append(format!("{}: {error}", self.path.display()))
        })
    }
}
