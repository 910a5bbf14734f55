//! Process-backed HTML validator adapter.
//!
//! This adapter owns process details only: argument assembly, timeout and
//! exit-status mapping, and turning the child's output into diagnostics. It
//! defaults to the Nu Html Checker (`vnu`), whose GNU-style messages arrive
//! one per line on stderr.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::ValidationReport;
use crate::domain::ports::{HtmlValidator, HtmlValidatorError};

/// Program started when none is configured.
pub const DEFAULT_VALIDATOR_COMMAND: &str = "vnu";
/// Time a validator run may take before it is killed.
pub const DEFAULT_VALIDATOR_TIMEOUT: Duration = Duration::from_secs(60);
/// Sole diagnostic recorded for a page without errors.
pub const ALL_GOOD: &str = "All good.";

/// Command line and filtering settings for [`ProcessHtmlValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorCommand {
    /// Program to run.
    pub program: String,
    /// Arguments placed before the page path.
    pub args: Vec<String>,
    /// Diagnostics containing any of these substrings are dropped.
    pub ignore: Vec<String>,
    /// Kill the validator after this long.
    pub timeout: Duration,
}

impl Default for ValidatorCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_VALIDATOR_COMMAND.to_owned(),
            args: Vec::new(),
            ignore: Vec::new(),
            timeout: DEFAULT_VALIDATOR_TIMEOUT,
        }
    }
}

/// Validator adapter that runs an external checker once per page.
#[derive(Debug, Clone)]
pub struct ProcessHtmlValidator {
    command: ValidatorCommand,
}

impl ProcessHtmlValidator {
    /// Build an adapter from its command settings.
    ///
    /// # Examples
    /// ```
    /// use html_validation::outbound::validator::{ProcessHtmlValidator, ValidatorCommand};
    ///
    /// let validator = ProcessHtmlValidator::new(ValidatorCommand {
    ///     args: vec!["--errors-only".to_owned()],
    ///     ..ValidatorCommand::default()
    /// });
    /// assert_eq!(validator.command().program, "vnu");
    /// ```
    #[must_use]
    pub fn new(command: ValidatorCommand) -> Self {
        Self { command }
    }

    /// Command settings in use.
    #[must_use]
    pub fn command(&self) -> &ValidatorCommand {
        &self.command
    }
}

#[async_trait]
impl HtmlValidator for ProcessHtmlValidator {
    async fn validate(&self, page: &Path) -> Result<ValidationReport, HtmlValidatorError> {
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .arg(page)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.command.timeout, command.output())
            .await
            .map_err(|_| HtmlValidatorError::timeout(timeout_millis(self.command.timeout)))?
            .map_err(|error| {
                HtmlValidatorError::spawn(format!("{}: {error}", self.command.program))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = collect_diagnostics(&stderr, &stdout, &self.command.ignore);
        debug!(
            program = %self.command.program,
            page = %page.display(),
            status = %output.status,
            diagnostics = diagnostics.len(),
            "validator finished"
        );

        if diagnostics.is_empty() {
            if !output.status.success() {
                return Err(HtmlValidatorError::failed(format!(
                    "{} exited with {} without reporting diagnostics",
                    self.command.program, output.status
                )));
            }
            return Ok(ValidationReport::new(0, vec![ALL_GOOD.to_owned()]));
        }
        Ok(ValidationReport::new(diagnostics.len(), diagnostics))
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

fn collect_diagnostics(stderr: &str, stdout: &str, ignore: &[String]) -> Vec<String> {
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !ignore.iter().any(|pattern| line.contains(pattern.as_str())))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    //! Unit tests for diagnostic collection and process handling.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn blank_lines_are_dropped_and_streams_are_ordered() {
        let lines = collect_diagnostics("first\n\n  \nsecond\r\n", "third\n", &[]);
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[rstest]
    fn ignored_patterns_remove_matching_lines() {
        let ignore = vec!["Attribute \"ng-".to_owned(), "doctype".to_owned()];
        let lines = collect_diagnostics(
            "a: error: Start tag seen without seeing a doctype first.\n\
             b: error: Attribute \"ng-app\" not allowed here.\n\
             c: error: Element \"asdfghjkl\" not allowed here.\n",
            "",
            &ignore,
        );
        assert_eq!(lines, vec!["c: error: Element \"asdfghjkl\" not allowed here."]);
    }

    #[cfg(unix)]
    fn shell_validator(script: &str) -> ProcessHtmlValidator {
        ProcessHtmlValidator::new(ValidatorCommand {
            program: "sh".to_owned(),
            args: vec!["-c".to_owned(), script.to_owned(), "validator".to_owned()],
            ignore: Vec::new(),
            timeout: Duration::from_secs(10),
        })
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn silent_successful_run_is_all_good() {
        let report = shell_validator("exit 0")
            .validate(Path::new("page.html"))
            .await
            .expect("validator runs");
        assert_eq!(report, ValidationReport::new(0, vec![ALL_GOOD.to_owned()]));
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn each_output_line_counts_as_an_error() {
        let report = shell_validator("echo \"$1: error: one\" >&2; echo \"$1: error: two\" >&2; exit 1")
            .validate(Path::new("page.html"))
            .await
            .expect("validator runs");
        assert_eq!(report.error_count, 2);
        assert_eq!(
            report.diagnostics,
            vec!["page.html: error: one", "page.html: error: two"]
        );
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn failing_run_without_output_is_an_error() {
        let error = shell_validator("exit 3")
            .validate(Path::new("page.html"))
            .await
            .expect_err("silent failure");
        assert!(matches!(error, HtmlValidatorError::Failed { .. }));
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn slow_validator_times_out() {
        let validator = ProcessHtmlValidator::new(ValidatorCommand {
            program: "sh".to_owned(),
            args: vec!["-c".to_owned(), "sleep 5".to_owned(), "validator".to_owned()],
            ignore: Vec::new(),
            timeout: Duration::from_millis(100),
        });
        let error = validator
            .validate(Path::new("page.html"))
            .await
            .expect_err("timeout");
        assert_eq!(error, HtmlValidatorError::timeout(100_u64));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let validator = ProcessHtmlValidator::new(ValidatorCommand {
            program: "html-validation-missing-validator".to_owned(),
            ..ValidatorCommand::default()
        });
        let error = validator
            .validate(Path::new("page.html"))
            .await
            .expect_err("spawn failure");
        assert!(matches!(error, HtmlValidatorError::Spawn { .. }));
    }
}
