//! Deployment profiles mirroring the per-environment Makefiles.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};
use crate::image::{ImageSpec, ImageTag};

/// Full deployment profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment metadata and registry coordinates
    pub deployment: DeploymentDetails,

    /// Image contract overrides
    #[serde(default)]
    pub image: ImageSpec,

    /// Liveness polling settings
    #[serde(default)]
    pub monitor: MonitorDetails,
}

/// Registry coordinates for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentDetails {
    /// Deployment name (e.g. "liquidation-bot")
    pub name: String,

    /// Container registry host
    pub registry_url: String,

    /// Registry project id
    pub project_id: String,

    /// Service (image) name
    pub service: String,

    /// Build context directory
    #[serde(default = "default_context")]
    pub context: String,
}

fn default_context() -> String {
    ".".to_string()
}

/// Liveness polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorDetails {
    /// Deployed service URL
    #[serde(default)]
    pub url: Option<String>,

    /// Poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for MonitorDetails {
    fn default() -> Self {
        Self {
            url: None,
            interval_secs: default_poll_interval_secs(),
        }
    }
}

impl DeploymentConfig {
    /// Load a deployment profile from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| DeployError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The deterministic tag this deployment builds and pushes.
    pub fn image_tag(&self) -> ImageTag {
        ImageTag::new(
            &self.deployment.registry_url,
            &self.deployment.project_id,
            &self.deployment.service,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_profile() {
        let toml = r#"
            [deployment]
            name = "liquidation-bot"
            registry_url = "eu.gcr.io"
            project_id = "ithil-goerli-bots"
            service = "liquidation-bot-py"
        "#;
        let config: DeploymentConfig = toml::from_str(toml).unwrap();

        assert_eq!(
            config.image_tag().reference(),
            "eu.gcr.io/ithil-goerli-bots/liquidation-bot-py:latest"
        );
        // serde defaults fill the rest
        assert_eq!(config.deployment.context, ".");
        assert_eq!(config.monitor.interval_secs, 5);
        assert_eq!(config.image.port, 8080);
        assert_eq!(config.image.user, "liquidation_bot");
    }

    #[test]
    fn test_parse_full_profile_from_file() {
        let toml = r#"
            [deployment]
            name = "price-bot"
            registry_url = "eu.gcr.io"
            project_id = "rinkeby-testnet-price-bot"
            service = "price-bot"
            context = "./service"

            [image]
            base_image = "python:3.10-slim"

            [monitor]
            url = "https://price-bot-ew2m3hq5oq-ew.a.run.app"
            interval_secs = 10
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("price-bot.toml");
        std::fs::write(&path, toml).unwrap();

        let config = DeploymentConfig::from_file(&path).unwrap();
        assert_eq!(config.deployment.context, "./service");
        assert_eq!(config.image.base_image, "python:3.10-slim");
        // unset image fields still default
        assert_eq!(config.image.entrypoint_module, "liquidation_bot");
        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(
            config.monitor.url.as_deref(),
            Some("https://price-bot-ew2m3hq5oq-ew.a.run.app")
        );
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "deployment = 3").unwrap();

        let err = DeploymentConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, DeployError::ConfigParse { .. }));
    }
}
