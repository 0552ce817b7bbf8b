use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{OctopusError, Result};

/// Public Octopus Energy REST API root.
pub const DEFAULT_BASE_URL: &str = "https://api.octopus.energy/v1";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "OCTOPUS_API_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONCURRENCY: usize = 4;

/// Client for the unauthenticated product and tariff endpoints of the Octopus API.
#[derive(Clone, Debug)]
pub struct OctopusClient {
    base_url: String,
    client: Client,
    concurrency: usize,
}

impl OctopusClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            client: build_http_client(DEFAULT_TIMEOUT)?,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    /// Creates a client, taking the base URL from `OCTOPUS_API_URL` when it is set.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new()?.with_base_url_override(std::env::var(BASE_URL_ENV).ok()))
    }

    /// Replaces the base URL when `base_url` is set and not blank.
    pub fn with_base_url_override(self, base_url: Option<String>) -> Self {
        match base_url {
            Some(url) if !url.trim().is_empty() => {
                info!(base_url = %url, "Overriding API base URL");
                self.with_base_url(url)
            }
            _ => self,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    /// Sets how many product detail requests may be in flight at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issues a GET and decodes the JSON body, turning any non-success status into
    /// [`OctopusError::HttpStatus`] carrying the response body.
    pub(crate) async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        debug!(%url, "GET");
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OctopusError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OctopusError::Config(format!("failed to build HTTP client: {e}")))
}
