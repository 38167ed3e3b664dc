//! Error types for hoist-release.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientSettingError {
    #[error("invalid proxy URL {url}: {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid token: {0}")]
    Token(#[source] reqwest::header::InvalidHeaderValue),

    #[error("failed to build client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientSettingError),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed release listing from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no release of {repo} has an asset matching '{pattern}'")]
    NoMatchingAsset { repo: String, pattern: String },

    #[error("no newer release found (current {current}, latest {latest})")]
    NoNewerRelease { current: String, latest: String },

    #[error("'{name}' not found in release archive")]
    BinaryNotFound { name: String },

    #[error("failed to locate the running executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to replace '{path}': {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Archive(#[from] hoist_archive::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
