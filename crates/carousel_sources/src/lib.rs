//! HTTP implementation of the station and parts sources.
//!
//! The remote service exposes `GET /stations` for the full station list and
//! `GET /trays/{trayId}/parts` for the contents of one tray, both as JSON.
//! Requests carry an opaque bearer credential when one is configured; errors
//! surface as typed [`FetchError`]s and never panic across the poll boundary.

use async_trait::async_trait;
use carousel_core::{FetchError, Part, StationRecord};
use carousel_engine::{PartsSource, StationSource};
use reqwest::StatusCode;

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpSource {
            client: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }
}

fn transport(err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        message: err.to_string(),
    }
}

#[async_trait]
impl StationSource for HttpSource {
    async fn poll_stations(&self) -> Result<Vec<StationRecord>, FetchError> {
        let response = self.get("/stations").send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }
        response.json().await.map_err(transport)
    }
}

#[async_trait]
impl PartsSource for HttpSource {
    async fn fetch_parts(&self, tray_id: &str) -> Result<Vec<Part>, FetchError> {
        let response = self
            .get(&format!("/trays/{tray_id}/parts"))
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        // An unknown tray is a valid empty tray, not an error.
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(tray_id, "tray unknown to the remote, treating as empty");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }
        response.json().await.map_err(transport)
    }
}
