//! Units of validation work handed to the dispatcher.

use std::fmt;
use std::str::FromStr;

use actix_web::web::Bytes;
use uuid::Uuid;

use super::PageSlug;

/// Identifier attached to every validation job.
///
/// # Examples
/// ```
/// use html_validation::domain::JobId;
///
/// let id: JobId = "00000000-0000-0000-0000-000000000000"
///     .parse()
///     .expect("valid UUID");
/// assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a new random job identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A response body waiting to be saved and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationJob {
    /// Job identifier used for log correlation.
    pub id: JobId,
    /// Name the page is stored under.
    pub slug: PageSlug,
    /// Buffered response body.
    pub body: Bytes,
}

impl ValidationJob {
    /// Create a job with a freshly generated identifier.
    ///
    /// # Examples
    /// ```
    /// use actix_web::web::Bytes;
    /// use html_validation::domain::{PageSlug, ValidationJob};
    ///
    /// let job = ValidationJob::new(
    ///     PageSlug::from_request_path("/about"),
    ///     Bytes::from_static(b"<!DOCTYPE html>"),
    /// );
    /// assert_eq!(job.slug.as_str(), "about");
    /// ```
    pub fn new(slug: PageSlug, body: impl Into<Bytes>) -> Self {
        Self {
            id: JobId::generate(),
            slug,
            body: body.into(),
        }
    }
}
