// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Classification server: accepts an image upload, answers with its category

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::category::CategoryLabel;
use crate::config::AppConfig;
use crate::oracle::upload::UploadResponse;
use crate::oracle::{classify_or_uncategorized, CategoryOracle};

/// Shared application state
pub struct AppState {
    pub oracle: Arc<dyn CategoryOracle>,
    pub config: AppConfig,
}

impl AppState {
    fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.server.upload_dir)
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = match state.config.server.upload_limit() {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/upload/", post(upload_image))
        .route("/upload", post(upload_image))
        .route("/api/categories", get(api_get_categories))
        .route("/health", get(health))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Store the `image` field, classify it, report the label.
///
/// Oracle failures answer `Uncategorized`, not an HTTP error.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some("image") {
            continue;
        }

        let filename = upload_name(field.file_name().unwrap_or("image"));
        let data = field.bytes().await.map_err(bad_request)?;

        let dir = state.upload_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(internal)?;
        let stored = dir.join(format!("{}_{}", Uuid::new_v4(), filename));
        tokio::fs::write(&stored, &data).await.map_err(internal)?;

        let (label, _) = classify_or_uncategorized(state.oracle.as_ref(), &stored).await;
        info!("{} -> {}", filename, label);

        if !state.config.server.keep_uploads {
            if let Err(e) = tokio::fs::remove_file(&stored).await {
                warn!("Failed to remove upload {:?}: {}", stored, e);
            }
        }

        return Ok(Json(UploadResponse {
            filename,
            category: label.to_string(),
        }));
    }

    Err(bad_request("missing multipart field 'image'"))
}

/// Client file names are reduced to their last component
fn upload_name(raw: &str) -> String {
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("image")
        .to_string()
}

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<&'static str>,
    fallback: &'static str,
}

async fn api_get_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: CategoryLabel::VOCABULARY.iter().map(|l| l.as_str()).collect(),
        fallback: CategoryLabel::Uncategorized.as_str(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    oracle: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        oracle: state.oracle.name(),
    })
}

/// Start the classification server
pub async fn start_server(config: AppConfig, oracle: Arc<dyn CategoryOracle>) -> crate::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState { oracle, config });

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Classification server listening on http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| crate::CullerError::Server(e.to_string()))?;

    Ok(())
}
