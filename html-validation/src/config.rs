//! Validation settings loaded via OrthoConfig.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::report::DEFAULT_REPORT_DIR;
use crate::outbound::queue::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, QueueConfig, max_workers};
use crate::outbound::validator::{DEFAULT_VALIDATOR_COMMAND, DEFAULT_VALIDATOR_TIMEOUT, ValidatorCommand};

/// Configuration values controlling where reports go and how pages are
/// validated.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "HTML_VALIDATION")]
pub struct HtmlValidationSettings {
    /// Report directory holding `html/` and `errors.txt`.
    pub output_dir: Option<PathBuf>,
    /// Validate on the background queue instead of inside the request.
    #[ortho_config(default = false)]
    pub background: bool,
    /// Append a random token to every saved page name.
    #[ortho_config(default = false)]
    pub unique_names: bool,
    /// Validator program.
    pub validator_command: Option<String>,
    /// Whitespace-separated arguments placed before the page path.
    pub validator_args: Option<String>,
    /// Comma-separated substrings; matching diagnostics are dropped.
    pub ignore: Option<String>,
    /// Seconds a validator run may take.
    pub timeout_seconds: Option<u64>,
    /// Jobs waiting in the background queue before new ones are refused.
    pub queue_capacity: Option<usize>,
    /// Background jobs validated concurrently.
    pub workers: Option<usize>,
    /// Responses larger than this are not validated.
    pub max_body_bytes: Option<u64>,
}

impl HtmlValidationSettings {
    /// Return the report directory, falling back to `html_validation`.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR))
    }

    /// Return the validator command line and filters.
    pub fn validator_command(&self) -> ValidatorCommand {
        ValidatorCommand {
            program: self
                .validator_command
                .clone()
                .filter(|program| !program.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VALIDATOR_COMMAND.to_owned()),
            args: self
                .validator_args
                .as_deref()
                .map(|args| args.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            ignore: self
                .ignore
                .as_deref()
                .map(|patterns| {
                    patterns
                        .split(',')
                        .map(str::trim)
                        .filter(|pattern| !pattern.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            timeout: self
                .timeout_seconds
                .map_or(DEFAULT_VALIDATOR_TIMEOUT, Duration::from_secs),
        }
    }

    /// Return the background queue sizing. Zero values are raised to one and
    /// the worker count is capped at [`max_workers`].
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
        }
        .clamped()
    }
}
