//! Profile selection and environment overlay.
//!
//! Resolution order: explicit name, then `DEPLOYMENT`, then the default
//! profile. A TOML file `<config_dir>/<name>.toml` wins over the built-in
//! profile of the same name, and the registry-coordinate environment
//! variables win over both.

use std::path::PathBuf;

use tracing::info;

use crate::config::{DeploymentConfig, DeploymentDetails, MonitorDetails};
use crate::error::{DeployError, Result};
use crate::image::ImageSpec;

/// Environment variable names understood by the loader.
pub mod env {
    /// Overrides the profile's registry host.
    pub const CONTAINER_REGISTRY_URL: &str = "CONTAINER_REGISTRY_URL";

    /// Overrides the profile's registry project id.
    pub const PROJECT_ID: &str = "PROJECT_ID";

    /// Overrides the profile's service name.
    pub const SERVICE: &str = "SERVICE";

    /// Selects the deployment profile.
    pub const DEPLOYMENT: &str = "DEPLOYMENT";

    /// Directory holding profile TOML files.
    pub const CONFIG_DIR: &str = "CONFIG_DIR";
}

/// Profile used when nothing selects one.
pub const DEFAULT_DEPLOYMENT: &str = "liquidation-bot";

/// Built-in profiles for the two known deployments.
pub fn builtin_profile(name: &str) -> Option<DeploymentConfig> {
    match name {
        "price-bot" => Some(DeploymentConfig {
            deployment: DeploymentDetails {
                name: "price-bot".to_string(),
                registry_url: "eu.gcr.io".to_string(),
                project_id: "rinkeby-testnet-price-bot".to_string(),
                service: "price-bot".to_string(),
                context: ".".to_string(),
            },
            image: ImageSpec::default(),
            monitor: MonitorDetails {
                url: Some("https://price-bot-ew2m3hq5oq-ew.a.run.app".to_string()),
                ..Default::default()
            },
        }),
        "liquidation-bot" => Some(DeploymentConfig {
            deployment: DeploymentDetails {
                name: "liquidation-bot".to_string(),
                registry_url: "eu.gcr.io".to_string(),
                project_id: "ithil-goerli-bots".to_string(),
                service: "liquidation-bot-py".to_string(),
                context: ".".to_string(),
            },
            image: ImageSpec::default(),
            monitor: MonitorDetails {
                url: Some("https://liquidation-bot-py-uxlvirlyfa-ew.a.run.app".to_string()),
                ..Default::default()
            },
        }),
        _ => None,
    }
}

/// Resolve a deployment profile.
pub fn load_deployment(name: Option<&str>) -> Result<DeploymentConfig> {
    let name = name
        .map(str::to_string)
        .or_else(|| std::env::var(env::DEPLOYMENT).ok())
        .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());

    let config_dir = std::env::var(env::CONFIG_DIR).unwrap_or_else(|_| "./config".to_string());
    let path = PathBuf::from(config_dir).join(format!("{name}.toml"));

    let mut config = if path.exists() {
        DeploymentConfig::from_file(&path)?
    } else {
        builtin_profile(&name).ok_or_else(|| DeployError::Config {
            message: format!(
                "unknown deployment '{name}' and no profile file at {}",
                path.display()
            ),
        })?
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    info!(
        deployment = %config.deployment.name,
        tag = %config.image_tag(),
        "Loaded deployment profile"
    );
    Ok(config)
}

/// Apply the registry-coordinate environment overrides.
///
/// The lookup is injected so tests do not mutate process environment.
pub fn apply_env_overrides(
    config: &mut DeploymentConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(value) = lookup(env::CONTAINER_REGISTRY_URL) {
        config.deployment.registry_url = value;
    }
    if let Some(value) = lookup(env::PROJECT_ID) {
        config.deployment.project_id = value;
    }
    if let Some(value) = lookup(env::SERVICE) {
        config.deployment.service = value;
    }
}
