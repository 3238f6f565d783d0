//! Secondary (HTTP) transport.
//!
//! Stateless call/response client used to probe duplex availability and as
//! the fallback path for routed requests.

mod request;

pub use request::OutboundRequest;

use crate::config::ChannelConfig;
use crate::error::transport::TransportError;

use common::HttpStatusCode;

use std::time::Duration;

use log::{debug, trace};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

const FILE_ID_QUERY_KEY: &str = "file_id";

#[derive(Debug, Deserialize)]
struct StatusResponse {
    available: bool,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    client: Client,
    status_path: String,
    interfaces_path: String,
    dynamic_prefix: String,
    probe_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ChannelConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url,
            client,
            status_path: config.status_path.clone(),
            interfaces_path: config.interfaces_path.clone(),
            dynamic_prefix: config.dynamic_prefix.clone(),
            probe_timeout: config.probe_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check whether the duplex service is available.
    ///
    /// Performs a GET to the status endpoint bounded by the probe timeout.
    ///
    /// # Returns
    ///
    /// * `true` - If the server answers 2xx with `{"available": true}`
    /// * `false` - On any failure: timeout, network error, non-2xx, bad body
    pub async fn probe(&self) -> bool {
        match self.fetch_status().await {
            Ok(available) => {
                debug!("Duplex status probe for {}: available={available}", self.base_url);
                available
            }
            Err(e) => {
                debug!(
                    "Duplex status probe for {} failed ({}): {e}",
                    self.base_url,
                    e.error_category()
                );
                false
            }
        }
    }

    async fn fetch_status(&self) -> Result<bool, TransportError> {
        let url = self.base_url.join(&self.status_path)?;

        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status: StatusResponse = Self::read_json(response).await?;
        Ok(status.available)
    }

    /// GET the interfaces resource, filtered by file when an id is given.
    pub async fn fetch_interfaces(&self, file_id: Option<i64>) -> Result<Value, TransportError> {
        let mut url = self.base_url.join(&self.interfaces_path)?;
        if let Some(id) = file_id {
            url.query_pairs_mut()
                .append_pair(FILE_ID_QUERY_KEY, &id.to_string());
        }

        trace!("GET {url}");
        let response = self.client.get(url).send().await?;

        Self::read_json(response).await
    }

    /// Call the dynamic proxy route for `request.path`.
    ///
    /// The body is always `{"params": ...}`, whatever the method.
    pub async fn call_dynamic(&self, request: &OutboundRequest) -> Result<Value, TransportError> {
        let url = self.dynamic_url(&request.path)?;

        trace!("{} {url}", request.method);
        let response = self
            .client
            .request(request.method.clone(), url)
            .json(&json!({ "params": request.params }))
            .send()
            .await?;

        Self::read_json(response).await
    }

    pub(crate) fn dynamic_url(&self, path: &str) -> Result<Url, TransportError> {
        let trimmed = path.trim_start_matches('/');
        let prefix = self.dynamic_prefix.trim_end_matches('/');
        let url = self.base_url.join(&format!("{prefix}/{trimmed}"))?;
        Ok(url)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = HttpStatusCode::from(response.status().as_u16());
        if !status.is_success() {
            return Err(TransportError::from_status(
                status.0,
                response.text().await.unwrap_or_default(),
            ));
        }

        let bytes = response.bytes().await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(value)
    }
}
