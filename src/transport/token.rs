//! Bearer token sources.
//!
//! A [`TokenSource`] yields the value for the vendor auth header. It is
//! either a fixed string captured at construction, or bound to a plain-text
//! token file that is lazily re-read when the cached value looks stale.
//!
//! The refresh model is check-on-read, not time-driven: no background task
//! exists, and the staleness check runs on the calling thread at token-read
//! time. The very first file read happens eagerly at construction and its
//! failure is surfaced as an error (fail-closed); later read failures keep
//! the last successfully parsed token (fail-open) and emit a warning.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{RestError, Result};

/// How long a cached file token is trusted before the file is re-read.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Source of bearer tokens for the vendor auth header.
#[derive(Debug)]
pub enum TokenSource {
    /// A fixed token captured at construction.
    Static(String),
    /// A token re-read from a file when stale.
    File(FileToken),
}

impl TokenSource {
    /// A source that always yields the given token.
    pub fn fixed(token: impl Into<String>) -> Self {
        TokenSource::Static(token.into())
    }

    /// A refreshing source bound to a plain-text token file, using the
    /// default refresh period.
    ///
    /// # Errors
    ///
    /// Fails if the initial read fails or the file is empty.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_file_with_period(path, DEFAULT_REFRESH_PERIOD)
    }

    /// A refreshing source with an explicit refresh period.
    pub fn from_file_with_period(path: impl Into<PathBuf>, period: Duration) -> Result<Self> {
        let path = path.into();
        let token = read_token(&path)?;
        Ok(TokenSource::File(FileToken {
            path,
            period,
            cache: Mutex::new(Cached {
                token,
                checked: Instant::now(),
            }),
        }))
    }

    /// The current token value.
    ///
    /// For a file source this may re-read the file; concurrent readers are
    /// serialized on the cache lock and always observe the last
    /// successfully read value.
    pub fn token(&self) -> String {
        match self {
            TokenSource::Static(token) => token.clone(),
            TokenSource::File(file) => file.current(),
        }
    }
}

/// Lazily refreshed token file cache.
pub struct FileToken {
    path: PathBuf,
    period: Duration,
    cache: Mutex<Cached>,
}

struct Cached {
    token: String,
    checked: Instant,
}

impl FileToken {
    fn current(&self) -> String {
        let mut cache = self.cache.lock();
        if cache.checked.elapsed() >= self.period {
            match read_token(&self.path) {
                Ok(token) => cache.token = token,
                Err(e) => {
                    // Fail open: keep serving the cached token.
                    warn!(path = %self.path.display(), error = %e, "bearer token refresh failed");
                }
            }
            cache.checked = Instant::now();
        }
        cache.token.clone()
    }
}

impl std::fmt::Debug for FileToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileToken")
            .field("path", &self.path)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

/// Read and trim a token file; an empty file is an error.
fn read_token(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| RestError::Token(format!("{}: {e}", path.display())))?;
    let token = raw.trim().to_string();
    if token.is_empty() {
        return Err(RestError::Token(format!(
            "{}: token file is empty",
            path.display()
        )));
    }
    Ok(token)
}
