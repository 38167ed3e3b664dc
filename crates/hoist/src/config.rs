use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hoist_release::{ClientSetting, DEFAULT_API_URL, ReleaseSource};
use serde::{Deserialize, Serialize};
use url::Url;

const ENV_PREFIX: &str = "HOIST_";
const CONFIG_ENV: &str = "HOIST_CONFIG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// GitHub repository, `owner/name`.
    pub repo: String,
    pub binary_name: String,
    pub asset_pattern: String,
    pub allow_prereleases: bool,
    pub api_url: String,
    pub token: Option<String>,
    pub proxies: Option<Vec<Url>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: "hoist-rs/hoist".to_string(),
            binary_name: "hoist".to_string(),
            asset_pattern: "hoist-{os}-{arch}".to_string(),
            allow_prereleases: true,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            proxies: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Defaults, then the config file if present, then `HOIST_*` variables.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = config_path() {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config", "log"]))
    }

    pub fn client_setting(&self) -> ClientSetting {
        ClientSetting {
            proxies: self.proxies.clone(),
            token: self.token.clone(),
        }
    }

    pub fn release_source(&self) -> ReleaseSource {
        ReleaseSource {
            repo: self.repo.clone(),
            binary_name: self.binary_name.clone(),
            asset_pattern: self.asset_pattern.clone(),
            allow_prereleases: self.allow_prereleases,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => Some(PathBuf::from(path)),
        None => home::home_dir().map(|home| home.join(".config").join("hoist").join("config.toml")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|jail| {
            jail.set_env("HOIST_CONFIG", jail.directory().join("absent.toml").display());
            assert_eq!(Config::load()?, Config::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hoist.toml",
                r#"
                    repo = "acme/tool"
                    binary_name = "tool"
                    allow_prereleases = false
                    proxies = ["http://proxy.local:3128"]
                "#,
            )?;
            jail.set_env("HOIST_CONFIG", jail.directory().join("hoist.toml").display());
            jail.set_env("HOIST_REPO", "acme/fork");
            jail.set_env("HOIST_TOKEN", "secret");

            let config = Config::load()?;
            assert_eq!(config.repo, "acme/fork");
            assert_eq!(config.binary_name, "tool");
            assert!(!config.allow_prereleases);
            assert_eq!(config.token.as_deref(), Some("secret"));
            assert_eq!(
                config.proxies,
                Some(vec![Url::parse("http://proxy.local:3128").unwrap()])
            );
            assert_eq!(config.asset_pattern, "hoist-{os}-{arch}");
            Ok(())
        });
    }

    #[test]
    fn release_source_mirrors_config() {
        let config = Config::default();
        let source = config.release_source();
        assert_eq!(source.repo, "hoist-rs/hoist");
        assert!(source.allow_prereleases);
        assert!(config.client_setting().token.is_none());
    }
}
