//! Firecrawl extract API client.
//!
//! `POST /v1/extract` starts a job and returns its id; `GET
//! /v1/extract/{id}` reports progress. The client only moves bytes; the
//! decision to retry or give up belongs to [`super::JobRunner`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{ExtractRequest, ExtractionApi, StatusResponse, SubmitResponse};
use crate::error::ExtractApiError;
use crate::security::ApiKey;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct FirecrawlClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
}

impl FirecrawlClient {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: FIRECRAWL_API_URL.to_string(),
        }
    }

    /// Use a self-hosted Firecrawl or a proxy.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn extract_url(&self) -> String {
        format!("{}/v1/extract", self.base_url)
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/v1/extract/{}", self.base_url, job_id)
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ExtractApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExtractionApi for FirecrawlClient {
    async fn submit(&self, request: &ExtractRequest) -> Result<SubmitResponse, ExtractApiError> {
        tracing::info!(urls = request.urls.len(), "Submitting Firecrawl extract job");

        let response = self
            .client
            .post(self.extract_url())
            .bearer_auth(self.api_key.expose())
            .header("Content-Type", "application/json")
            .timeout(SUBMIT_TIMEOUT)
            .json(request)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ExtractApiError> {
        let response = self
            .client
            .get(self.status_url(job_id))
            .bearer_auth(self.api_key.expose())
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ExtractApiError::JobNotFound {
                id: job_id.to_string(),
            });
        }

        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let client = FirecrawlClient::new(ApiKey::new("firecrawl", "fc-test"));
        assert_eq!(client.extract_url(), "https://api.firecrawl.dev/v1/extract");
        assert_eq!(
            client.status_url("abc-123"),
            "https://api.firecrawl.dev/v1/extract/abc-123"
        );
    }

    #[test]
    fn test_custom_base_url() {
        let client = FirecrawlClient::new(ApiKey::new("firecrawl", "fc-test"))
            .with_base_url("http://localhost:3002/");
        assert_eq!(client.extract_url(), "http://localhost:3002/v1/extract");
    }

    #[test]
    fn test_status_response_decoding() {
        let pending: StatusResponse =
            serde_json::from_str(r#"{"success":true,"status":"processing","expiresAt":"2025-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(pending.success);
        assert!(pending.data.is_none());

        let failed: StatusResponse =
            serde_json::from_str(r#"{"success":false,"error":"Job not found"}"#).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Job not found"));
    }

    #[test]
    fn test_submit_response_decoding() {
        let ok: SubmitResponse = serde_json::from_str(r#"{"success":true,"id":"job-1"}"#).unwrap();
        assert_eq!(ok.id.as_deref(), Some("job-1"));

        let missing: SubmitResponse = serde_json::from_str("{}").unwrap();
        assert!(!missing.success);
        assert!(missing.id.is_none());
    }
}
