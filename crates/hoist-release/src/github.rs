//! GitHub release lookup and asset download.
//!
//! Requests run on [`POOL`] behind a blocking facade; callers never see a
//! future.

use std::env;
use std::path::{Path, PathBuf};

use hoist_version::Version;
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::setting::{ClientSetting, POOL};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ARCHIVE_SUFFIX: &str = ".tar.gz";

#[derive(Clone, Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// The newest installable release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Latest {
    /// Release tag, as published.
    pub version: String,
    pub url: String,
    pub asset: String,
}

/// Substitute `{os}` and `{arch}` for the running platform.
pub fn expand_pattern(pattern: &str) -> String {
    expand_pattern_for(pattern, env::consts::OS, env::consts::ARCH)
}

pub fn expand_pattern_for(pattern: &str, os: &str, arch: &str) -> String {
    pattern.replace("{os}", os).replace("{arch}", arch)
}

/// Pick the highest-versioned release carrying an asset named
/// `{prefix}*.tar.gz`.
///
/// Drafts are never considered, prereleases only when allowed. Releases whose
/// tag is not a version are ignored.
pub fn select_latest(releases: &[Release], prefix: &str, allow_prereleases: bool) -> Option<Latest> {
    let mut candidates: Vec<(Version, &Release)> = releases
        .iter()
        .filter(|release| !release.draft)
        .filter_map(|release| match Version::parse(&release.tag_name) {
            Ok(version) => Some((version, release)),
            Err(e) => {
                debug!(tag = %release.tag_name, error = %e, "ignoring release");
                None
            }
        })
        .filter(|(version, release)| {
            allow_prereleases || !(release.prerelease || version.is_prerelease())
        })
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    candidates.into_iter().find_map(|(_, release)| {
        release
            .assets
            .iter()
            .find(|asset| asset.name.starts_with(prefix) && asset.name.ends_with(ARCHIVE_SUFFIX))
            .map(|asset| Latest {
                version: release.tag_name.clone(),
                url: asset.browser_download_url.clone(),
                asset: asset.name.clone(),
            })
    })
}

pub struct GithubClient {
    api_url: Url,
    client: Client,
}

impl GithubClient {
    pub fn new(api_url: &str, setting: ClientSetting) -> Result<Self> {
        let api_url = parse_url(api_url)?;
        let client = setting.build()?;
        Ok(Self { api_url, client })
    }

    /// All published releases of `repo` (`owner/name`), as listed by the API.
    pub fn releases(&self, repo: &str) -> Result<Vec<Release>> {
        let base = self.api_url.as_str().trim_end_matches('/');
        let url = parse_url(&format!("{base}/repos/{repo}/releases?per_page=100"))?;

        POOL.block_on(async {
            let res = self.get(&url).await?;
            let body = res.text().await.map_err(|source| Error::Request {
                url: url.to_string(),
                source,
            })?;
            serde_json::from_str(&body).map_err(|source| Error::Decode {
                url: url.to_string(),
                source,
            })
        })
    }

    pub fn latest(&self, repo: &str, asset_pattern: &str, allow_prereleases: bool) -> Result<Latest> {
        let releases = self.releases(repo)?;
        let prefix = expand_pattern(asset_pattern);

        let latest = select_latest(&releases, &prefix, allow_prereleases).ok_or_else(|| {
            Error::NoMatchingAsset {
                repo: repo.to_string(),
                pattern: prefix.clone(),
            }
        })?;
        debug!(repo, version = %latest.version, asset = %latest.asset, "latest release");
        Ok(latest)
    }

    /// Stream `url` into `dest_dir`, named after the last URL segment.
    pub fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = parse_url(url)?;
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("download");
        let path = dest_dir.join(name);
        let io = |source| Error::Io {
            path: path.clone(),
            source,
        };

        POOL.block_on(async {
            let mut res = self.get(&url).await?;
            let mut file = File::create(&path).await.map_err(io)?;
            let mut written = 0u64;

            while let Some(chunk) = res.chunk().await.map_err(|source| Error::Request {
                url: url.to_string(),
                source,
            })? {
                file.write_all(&chunk).await.map_err(io)?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(io)?;

            info!(url = %url, path = %path.display(), bytes = written, "downloaded release asset");
            Ok::<_, Error>(path.clone())
        })
    }

    async fn get(&self, url: &Url) -> Result<Response> {
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(res)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| Error::InvalidUrl {
        url: url.to_string(),
        source,
    })
}
