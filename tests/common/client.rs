//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Prediction Endpoints
    // ========================================================================

    /// POST /predict with a raw JSON body
    pub async fn predict(&self, body: &str) -> Response {
        self.post_json("/predict", body.to_string()).await
    }

    /// POST /predict-api with a raw JSON body
    pub async fn predict_api(&self, body: &str) -> Response {
        self.post_json("/predict-api", body.to_string()).await
    }

    /// POST /v1/predict/batch with a JSON list of requests
    pub async fn predict_batch(&self, items: &[&str]) -> Response {
        self.post_json("/v1/predict/batch", format!("[{}]", items.join(",")))
            .await
    }

    /// POST /predict-web with url-encoded form fields
    pub async fn predict_web(&self, fields: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url("/predict-web"))
            .form(fields)
            .send()
            .await
            .expect("Predict web request failed")
    }

    async fn post_json(&self, path: &str, body: String) -> Response {
        self.client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("Predict request failed")
    }

    // ========================================================================
    // Info Endpoints
    // ========================================================================

    /// GET /v1/options
    pub async fn options(&self) -> Response {
        self.client
            .get(self.url("/v1/options"))
            .send()
            .await
            .expect("Options request failed")
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /v1/stats
    pub async fn stats(&self) -> Response {
        self.client
            .get(self.url("/v1/stats"))
            .send()
            .await
            .expect("Stats request failed")
    }
}
