// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama API client and vision-model oracle

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::GenericImageView;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{render_prompt, CategoryOracle};
use crate::category::CategoryLabel;
use crate::{AppConfig, CullerError, Result};

/// Longest side sent to the vision model
const MAX_IMAGE_SIDE: u32 = 1024;

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        // Accept either the server root or a full endpoint URL
        let base_url = base_url
            .trim_end_matches('/')
            .replace("/api/generate", "")
            .replace("/api/chat", "");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                CullerError::OracleUnavailable(format!(
                    "Cannot connect to Ollama at {}: {}",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check if a specific model is available
    pub async fn model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m.starts_with(model) || m == &format!("{}:latest", model)))
    }

    /// Generate with image (for vision models)
    pub async fn generate_with_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            images: Some(vec![image_base64.to_string()]),
        };

        debug!("Sending vision request to Ollama: model={}", model);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(CullerError::OracleUnavailable(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response.json().await?;
        Ok(result.response)
    }
}

/// Oracle backed by an Ollama vision model
pub struct OllamaOracle {
    client: OllamaClient,
    model: String,
    prompt: String,
}

impl OllamaOracle {
    pub fn new(client: OllamaClient, model: &str, prompt_template: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            prompt: render_prompt(prompt_template),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = OllamaClient::new(
            &config.oracle.url,
            Duration::from_secs(config.oracle.timeout_secs),
        )?;
        Ok(Self::new(client, &config.oracle.model, &config.prompts.classify))
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CategoryOracle for OllamaOracle {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn classify(&self, image: &Path) -> Result<CategoryLabel> {
        let path = image.to_path_buf();
        // Decoding and resizing is CPU bound
        let encoded = tokio::task::spawn_blocking(move || encode_for_model(&path))
            .await
            .map_err(|e| CullerError::Oracle(format!("Image preparation task failed: {}", e)))??;

        let reply = self
            .client
            .generate_with_image(&self.model, &self.prompt, &encoded)
            .await?;

        Ok(CategoryLabel::from_response(&reply))
    }
}

/// Base64 payload for the vision model: resized JPEG, or the raw file if it won't decode
pub fn encode_for_model(path: &Path) -> Result<String> {
    match prepare_image(path) {
        Ok(data) => Ok(general_purpose::STANDARD.encode(&data)),
        Err(e) => {
            debug!("Sending {:?} unprocessed: {}", path, e);
            let data = std::fs::read(path)?;
            Ok(general_purpose::STANDARD.encode(&data))
        }
    }
}

/// Resize large images and re-encode as JPEG
fn prepare_image(path: &Path) -> Result<Vec<u8>> {
    let img = image::open(path)?;

    let (width, height) = img.dimensions();
    let img = if width > MAX_IMAGE_SIDE || height > MAX_IMAGE_SIDE {
        img.resize(MAX_IMAGE_SIDE, MAX_IMAGE_SIDE, image::imageops::FilterType::Triangle)
    } else {
        img
    };

    // JPEG has no alpha channel
    let img = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

    Ok(buffer)
}
