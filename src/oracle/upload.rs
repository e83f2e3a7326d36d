// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Oracle that uploads the raw file to a classification server (`culler-server`)

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::CategoryOracle;
use crate::category::CategoryLabel;
use crate::{AppConfig, CullerError, Result};

/// Reply body of `POST /upload/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub filename: String,
    pub category: String,
}

/// Multipart upload client for the classification server
pub struct UploadOracle {
    client: Client,
    endpoint: String,
}

impl UploadOracle {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint_url(endpoint),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.oracle.url, Duration::from_secs(config.oracle.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CategoryOracle for UploadOracle {
    fn name(&self) -> &'static str {
        "upload"
    }

    async fn classify(&self, image: &Path) -> Result<CategoryLabel> {
        let data = tokio::fs::read(image).await?;
        let filename = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let part = Part::bytes(data)
            .file_name(filename)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("image", part);

        debug!("Uploading {:?} to {}", image, self.endpoint);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(CullerError::Oracle(format!(
                "Classification server returned status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response.json().await?;
        Ok(CategoryLabel::from_response(&body.category))
    }
}

/// Accept either the server root or the full `/upload/` endpoint
fn endpoint_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/upload") {
        format!("{}/", trimmed)
    } else {
        format!("{}/upload/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(endpoint_url("http://127.0.0.1:8000"), "http://127.0.0.1:8000/upload/");
        assert_eq!(endpoint_url("http://127.0.0.1:8000/"), "http://127.0.0.1:8000/upload/");
        assert_eq!(endpoint_url("http://127.0.0.1:8000/upload/"), "http://127.0.0.1:8000/upload/");
        assert_eq!(endpoint_url("http://127.0.0.1:8000/upload"), "http://127.0.0.1:8000/upload/");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let oracle = UploadOracle::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = oracle.classify(Path::new("/no/such/image.png")).await.unwrap_err();
        assert!(matches!(err, CullerError::FileSystem(_)));
    }

    #[test]
    fn test_response_shape() {
        let body: UploadResponse =
            serde_json::from_str(r#"{"filename": "cat.jpg", "category": "Animals"}"#).unwrap();
        assert_eq!(CategoryLabel::from_response(&body.category), CategoryLabel::Animals);
    }
}
