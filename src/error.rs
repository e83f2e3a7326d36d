// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Culler

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Culler operations
pub type Result<T> = std::result::Result<T, CullerError>;

/// Culler error types
#[derive(Error, Debug)]
pub enum CullerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Oracle not available: {0}")]
    OracleUnavailable(String),

    #[error("Oracle failure: {0}")]
    Oracle(String),

    #[error("Image is not pending in this session: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No bucket for category: {0}")]
    CategoryNotFound(String),

    #[error("Failed to dispose {}: {reason}", path.display())]
    Disposal { path: PathBuf, reason: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}
