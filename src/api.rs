//! HTTP client for the remote backtesting engine
//!
//! Thin reqwest wrapper around the engine's three endpoints: indicator
//! metadata, the preset catalog, and final submission. All requests are
//! POSTs carrying the bearer token and a `Source: WEB` header.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::metadata::{IndicatorDescriptor, MetadataService, RawDescriptor};
use crate::payload::BacktestRequest;
use crate::preset::PresetCatalog;
use crate::types::{MetadataError, SubmitError};

pub const DEFAULT_BASE_URL: &str = "https://vtest.modernalgos.com";

#[derive(Debug, Clone)]
pub struct EngineClient {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl EngineClient {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        EngineClient {
            base_url: base_url.into(),
            auth_token,
            client: reqwest::Client::new(),
        }
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);
        let mut builder = self.client.post(&url).header("Source", "WEB");
        if let Some(token) = &self.auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    /// Fetch one indicator's descriptor. `indicator` is the API value
    /// (see `metadata::indicator_api_value`), not the display label.
    pub async fn fetch_indicator_descriptor(
        &self,
        indicator: &str,
    ) -> Result<IndicatorDescriptor, MetadataError> {
        let response = self
            .post("/technical_param")
            .json(&serde_json::json!({ "indicator": indicator }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Http {
                status: status.as_u16(),
                message: error_message(response, status).await,
            });
        }

        let raw: RawDescriptor = response
            .json()
            .await
            .map_err(|e| MetadataError::Malformed(e.to_string()))?;
        Ok(IndicatorDescriptor::from_raw(raw))
    }

    /// Fetch the preset catalog
    pub async fn fetch_preset_catalog(&self) -> Result<PresetCatalog, MetadataError> {
        let response = self.post("/technical_default_strategies").send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Http {
                status: status.as_u16(),
                message: error_message(response, status).await,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MetadataError::Malformed(e.to_string()))
    }

    /// Submit a compiled backtest request. Non-2xx responses surface the
    /// server-supplied message when one exists.
    pub async fn submit(&self, request: &BacktestRequest) -> Result<SubmissionResult, SubmitError> {
        info!("submitting backtest for {}", request.symbolchart);

        let response = self.post("/AT_BackTesting").json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Http {
                status: status.as_u16(),
                message: error_message(response, status).await,
            });
        }

        let result: SubmissionResult = response
            .json()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;
        info!("backtest submitted: {:?}", result.message);
        Ok(result)
    }
}

impl MetadataService for EngineClient {
    async fn indicator_descriptor(
        &self,
        indicator: &str,
    ) -> Result<IndicatorDescriptor, MetadataError> {
        self.fetch_indicator_descriptor(indicator).await
    }

    async fn preset_catalog(&self) -> Result<PresetCatalog, MetadataError> {
        self.fetch_preset_catalog().await
    }
}

/// Engine acknowledgement for a submitted backtest
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionResult {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

async fn error_message(response: reqwest::Response, status: StatusCode) -> String {
    response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()))
}
