// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Category oracles: the external services that label one image at a time

pub mod ollama;
pub mod upload;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::category::CategoryLabel;
use crate::config::{AppConfig, OracleBackend};
use crate::Result;

pub use ollama::{OllamaClient, OllamaOracle};
pub use upload::UploadOracle;

/// Trait for image classifiers
#[async_trait]
pub trait CategoryOracle: Send + Sync {
    /// Name of this oracle, for logs
    fn name(&self) -> &'static str;

    /// Classify one image into the vocabulary or `Uncategorized`.
    ///
    /// Errors are transport or model failures. Callers in the triage core never
    /// propagate them; see [`classify_or_uncategorized`].
    async fn classify(&self, image: &Path) -> Result<CategoryLabel>;
}

/// Classify an image, mapping any oracle failure to `Uncategorized`.
///
/// The second element is `true` when the oracle call failed.
pub async fn classify_or_uncategorized(oracle: &dyn CategoryOracle, image: &Path) -> (CategoryLabel, bool) {
    match oracle.classify(image).await {
        Ok(label) => {
            debug!("{} classified {:?} as {}", oracle.name(), image, label);
            (label, false)
        }
        Err(e) => {
            warn!("{} failed on {:?}: {}, using Uncategorized", oracle.name(), image, e);
            (CategoryLabel::Uncategorized, true)
        }
    }
}

/// Build the oracle selected in the configuration
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn CategoryOracle>> {
    let oracle: Arc<dyn CategoryOracle> = match config.oracle.backend {
        OracleBackend::Ollama => Arc::new(OllamaOracle::from_config(config)?),
        OracleBackend::Upload => Arc::new(UploadOracle::from_config(config)?),
    };
    Ok(oracle)
}

/// Build the classification prompt from a template containing `{categories}`
pub fn render_prompt(template: &str) -> String {
    template.replace("{categories}", &CategoryLabel::vocabulary_list())
}


#[cfg(test)]
mod tests {
    use super::fake::MapOracle;
    use super::*;

    #[tokio::test]
    async fn test_failure_maps_to_uncategorized() {
        let oracle = MapOracle::new([("a.jpg", CategoryLabel::Food)]).failing_on("b.jpg");

        assert_eq!(
            classify_or_uncategorized(&oracle, Path::new("a.jpg")).await,
            (CategoryLabel::Food, false)
        );
        assert_eq!(
            classify_or_uncategorized(&oracle, Path::new("b.jpg")).await,
            (CategoryLabel::Uncategorized, true)
        );
        assert_eq!(oracle.calls(), 2);
    }

    #[test]
    fn test_render_prompt() {
        let prompt = render_prompt("Pick one of {categories}.");
        assert_eq!(
            prompt,
            "Pick one of Nature, Landscape, People, Animals, Food, Buildings, \
             Technology, Vehicles, Art, Documents."
        );
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = AppConfig::default();
        assert_eq!(from_config(&config).unwrap().name(), "ollama");

        config.oracle.backend = OracleBackend::Upload;
        assert_eq!(from_config(&config).unwrap().name(), "upload");
    }
}
