//! Settings source backed by the ride-hailing backend's settings API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::model::{MapSettings, ServiceStatus};
use crate::ports::{SettingsError, SettingsSource};

const SETTINGS_PATH: &str = "/settings";
const STATUS_PATH: &str = "/settings/status";

/// Reads map settings over HTTP.
pub struct HttpSettingsSource {
    client: Client,
    base_url: String,
}

impl HttpSettingsSource {
    /// Create a source for the API rooted at `base_url`, e.g. `https://api.example.com/api`.
    #[must_use]
    pub fn new<S: Into<String>>(client: Client, base_url: S) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl SettingsSource for HttpSettingsSource {
    async fn settings(&self) -> Result<MapSettings, SettingsError> {
        fetch_json(self.client.get(self.endpoint(SETTINGS_PATH))).await
    }

    async fn status(&self) -> Result<ServiceStatus, SettingsError> {
        fetch_json(self.client.get(self.endpoint(STATUS_PATH))).await
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, SettingsError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SettingsError::Unavailable(format!(
            "{} returned {status}",
            resp.url()
        )));
    }
    resp.json().await.map_err(SettingsError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_ignore_trailing_slash() {
        let source = HttpSettingsSource::new(Client::new(), "http://localhost:8000/api/");
        assert_eq!(
            source.endpoint(SETTINGS_PATH),
            "http://localhost:8000/api/settings"
        );
        assert_eq!(
            source.endpoint(STATUS_PATH),
            "http://localhost:8000/api/settings/status"
        );
    }
}
