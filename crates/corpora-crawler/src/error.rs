use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single GET attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // A host that can't be reached isn't retried, only slow responses are
        if e.is_timeout() && !e.is_connect() {
            Self::Timeout
        } else {
            Self::Other(e.into())
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("gave up on {url} after {attempts} timed out attempts")]
    Exhausted { url: String, attempts: u32 },
    #[error("couldn't fetch {url} got: {source}")]
    Permanent {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no content found")]
    MissingContent,
    #[error("invalid next page link {href:?} got: {source}")]
    InvalidNextUrl {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything that can abort the download of one document.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("couldn't extract page {url} got: {source}")]
    Extraction {
        url: String,
        #[source]
        source: ExtractError,
    },
    #[error("page cycle detected, {url} was already visited")]
    CycleDetected { url: String },
    #[error("couldn't store {} got: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{}:{line}: {source}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}:{line}: {reason}", file.display())]
    Invalid {
        file: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("target path {} is used by both {first} and {second}", path.display())]
    DuplicateTarget {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error("invalid index pattern got: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
}
