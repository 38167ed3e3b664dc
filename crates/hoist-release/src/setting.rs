use once_cell::sync::Lazy;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use tokio::runtime::Runtime;
use url::Url;

use crate::error::ClientSettingError;

/// Runtime that drives every request made through the blocking facade.
pub static POOL: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to start the HTTP runtime")
});

const USER_AGENT: &str = concat!("hoist/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, Default)]
pub struct ClientSetting {
    pub proxies: Option<Vec<Url>>,
    /// Sent as a bearer token; raises the API rate limit.
    pub token: Option<String>,
}

impl ClientSetting {
    pub fn build(self) -> Result<Client, ClientSettingError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = self.token {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(ClientSettingError::Token)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let mut cb = Client::builder().user_agent(USER_AGENT).default_headers(headers);

        if let Some(proxies) = self.proxies {
            let (secure, insecure): (Vec<Url>, Vec<Url>) =
                proxies.into_iter().partition(|u| u.scheme() == "https");

            for u in secure {
                cb = cb.proxy(Proxy::https(u.as_str()).map_err(|source| ClientSettingError::Proxy {
                    url: u.to_string(),
                    source,
                })?);
            }

            for u in insecure {
                cb = cb.proxy(Proxy::http(u.as_str()).map_err(|source| ClientSettingError::Proxy {
                    url: u.to_string(),
                    source,
                })?);
            }
        }

        Ok(cb.build()?)
    }
}
