//! Self-update from GitHub releases.
//!
//! # Architecture
//!
//! - [`setting`] - HTTP client construction (proxies, token) and the shared runtime
//! - [`github`] - Release listing, asset selection and download
//! - [`update`] - Download, extract and swap the running executable

pub mod github;
pub mod setting;
pub mod update;

mod error;

pub use error::{ClientSettingError, Error, Result};
pub use github::{DEFAULT_API_URL, GithubClient, Latest, expand_pattern};
pub use setting::ClientSetting;
pub use update::{ReleaseSource, Updater, find_binary, replace_executable};
