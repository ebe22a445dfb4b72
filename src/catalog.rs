use std::time::Duration;

use tracing::debug;

use crate::adapter::{Client, ProbeRequest, ProbeResponse};
use crate::error::{ProbeError, ProbeResult};
use crate::movie::MoviePayload;

/// `POST {base}` and `GET {base}/{key}` against the movie catalog.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl CatalogClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn movie_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    pub async fn create(&self, payload: &MoviePayload) -> ProbeResult<ProbeResponse> {
        let request = ProbeRequest::post(self.base_url.as_str())
            .with_json_body(payload)?
            .with_timeout(self.timeout);
        let response = self.client.execute(request).await?;
        debug!(
            method = "POST",
            url = %self.base_url,
            key = %payload.key(),
            status = response.status,
            elapsed_us = response.elapsed_micros() as u64,
            "create"
        );
        Ok(response)
    }

    pub async fn fetch(&self, key: &str) -> ProbeResult<ProbeResponse> {
        let url = self.movie_url(key);
        let request = ProbeRequest::get(url.as_str()).with_timeout(self.timeout);
        let response = self.client.execute(request).await?;
        debug!(
            method = "GET",
            url = %url,
            status = response.status,
            elapsed_us = response.elapsed_micros() as u64,
            "fetch"
        );
        Ok(response)
    }

    /// Decoded movie for a 2xx, `None` for a 404, [`ProbeError::Status`]
    /// for anything else.
    pub async fn fetch_movie(&self, key: &str) -> ProbeResult<Option<MoviePayload>> {
        let response = self.fetch(key).await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(ProbeError::Status {
                url: self.movie_url(key),
                status: response.status,
            });
        }
        response
            .json::<MoviePayload>()
            .map(Some)
            .map_err(|err| ProbeError::Decode(err.message))
    }
}
