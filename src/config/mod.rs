// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Culler

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Classification oracle
    pub oracle: OracleConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Folder scanning
    #[serde(default)]
    pub ingest: IngestConfig,

    /// What "delete" does on disk
    #[serde(default)]
    pub disposal: DisposalConfig,

    /// Classification server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which transport classifies images
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    /// Talk to an Ollama vision model directly
    Ollama,
    /// Upload to a `culler-server` instance
    Upload,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_backend")]
    pub backend: OracleBackend,
    pub url: String,
    #[serde(default = "default_vision_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Oracle calls in flight during a category build
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    /// `{categories}` is replaced with the vocabulary
    #[serde(default = "default_classify_prompt")]
    pub classify: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisposalConfig {
    /// Move deleted images to the recycle bin
    #[serde(default = "default_true")]
    pub use_trash: bool,
    /// Remove the file outright when the recycle bin refuses it
    #[serde(default)]
    pub remove_on_trash_failure: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default)]
    pub keep_uploads: bool,
    /// Largest accepted upload body; 0 lifts the limit
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    /// Upload body limit in bytes, `None` when unlimited
    pub fn upload_limit(&self) -> Option<usize> {
        (self.max_upload_mb > 0).then(|| self.max_upload_mb.saturating_mul(1024 * 1024))
    }
}

// Default value functions
fn default_backend() -> OracleBackend { OracleBackend::Ollama }
fn default_vision_model() -> String { "moondream".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_concurrency() -> usize { 4 }
fn default_true() -> bool { true }
fn default_server_host() -> String { "127.0.0.1".to_string() }
fn default_server_port() -> u16 { 8000 }
fn default_upload_dir() -> String { "uploads".to_string() }
fn default_max_upload_mb() -> usize { 64 }

fn default_extensions() -> Vec<String> {
    vec!["png", "jpg", "jpeg"].into_iter().map(String::from).collect()
}

fn default_classify_prompt() -> String {
    "Categorize this image based on [{categories}]. \
     Only reply with one word from the list.".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig {
                backend: default_backend(),
                url: "http://localhost:11434".to_string(),
                model: default_vision_model(),
                timeout_secs: default_timeout(),
                concurrency: default_concurrency(),
            },
            prompts: PromptConfig::default(),
            ingest: IngestConfig::default(),
            disposal: DisposalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            classify: default_classify_prompt(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            recursive: false,
        }
    }
}

impl Default for DisposalConfig {
    fn default() -> Self {
        Self {
            use_trash: true,
            remove_on_trash_failure: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            upload_dir: default_upload_dir(),
            keep_uploads: false,
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::CullerError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would stall or misconfigure a session
    pub fn validate(&self) -> crate::Result<()> {
        if self.oracle.concurrency == 0 {
            return Err(crate::CullerError::Config(
                "oracle.concurrency must be at least 1".to_string(),
            ));
        }
        if self.oracle.url.trim().is_empty() {
            return Err(crate::CullerError::Config("oracle.url is empty".to_string()));
        }
        if !self.prompts.classify.contains("{categories}") {
            tracing::warn!("Classification prompt does not list the categories");
        }
        Ok(())
    }
}
