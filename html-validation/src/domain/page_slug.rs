//! Filesystem-safe page names derived from request paths.
//!
//! Slugs are non-empty identifiers composed of lowercase ASCII letters,
//! digits, and single hyphens, never starting or ending with a hyphen.
//! Non-ASCII text is transliterated first, so `café` becomes `cafe`.

use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Slug used when a request path has no usable characters, e.g. `/`.
pub const INDEX_SLUG: &str = "index";

/// Upper bound on slug length so `<slug>-<suffix>.html` stays well inside
/// common file name limits.
pub const MAX_SLUG_LEN: usize = 200;

/// Length of the random token appended by [`PageSlug::with_random_suffix`].
pub const RANDOM_SUFFIX_LEN: usize = 8;

/// Name under which a response page is stored on disk.
///
/// # Examples
/// ```
/// use html_validation::domain::PageSlug;
///
/// let slug = PageSlug::from_request_path("/Blog/2024/Hello%20World/");
/// assert_eq!(slug.as_str(), "blog-2024-hello-world");
/// assert_eq!(slug.file_name(), "blog-2024-hello-world.html");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageSlug(String);

impl PageSlug {
    /// Derive a slug from a (possibly percent-encoded) request path.
    #[must_use]
    pub fn from_request_path(path: &str) -> Self {
        let decoded = urlencoding::decode(path).map_or_else(|_| path.into(), |value| value);
        let slug = slugify(&decoded);
        if slug.is_empty() {
            Self(INDEX_SLUG.to_owned())
        } else {
            Self(slug)
        }
    }

    /// Append `-<token>` after slugifying the token.
    ///
    /// A token that slugifies to nothing leaves the slug unchanged.
    ///
    /// # Examples
    /// ```
    /// use html_validation::domain::PageSlug;
    ///
    /// let slug = PageSlug::from_request_path("/about").with_suffix("Run 7");
    /// assert_eq!(slug.as_str(), "about-run-7");
    /// ```
    #[must_use]
    pub fn with_suffix(self, token: &str) -> Self {
        let token = slugify(token);
        if token.is_empty() {
            return self;
        }
        Self(format!("{}-{token}", self.0))
    }

    /// Append a random lowercase alphanumeric token so that repeated requests
    /// for the same path are stored under distinct names.
    #[must_use]
    pub fn with_random_suffix<R: Rng>(self, rng: &mut R) -> Self {
        let token: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
            .collect();
        self.with_suffix(&token)
    }

    /// File name used for the stored page.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.html", self.0)
    }

    /// Borrow the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PageSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for PageSlug {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut out = String::with_capacity(ascii.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if out.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    // Only ASCII is ever pushed, so byte truncation lands on a char boundary.
    out.truncate(MAX_SLUG_LEN);
    let trimmed_len = out.trim_end_matches('-').len();
    out.truncate(trimmed_len);
    out
}
