//! Container image identity and the image contract.
//!
//! The contract is what the supplied service image guarantees: the
//! entrypoint module, the exposed port, and the dedicated non-root runtime
//! user. It is rendered into a Dockerfile for builds and checked back
//! against `docker image inspect` after them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};

/// Port the packaged service listens on.
pub const SERVICE_PORT: u16 = 8080;

/// Dedicated non-root user and group inside the image.
pub const RUNTIME_USER: &str = "liquidation_bot";

/// Python module started as the container entrypoint.
pub const ENTRYPOINT_MODULE: &str = "liquidation_bot";

/// Fully qualified image tag: `registry/project/service:latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag {
    pub registry: String,
    pub project: String,
    pub service: String,
}

impl ImageTag {
    pub fn new(
        registry: impl Into<String>,
        project: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            project: project.into(),
            service: service.into(),
        }
    }

    /// The tag is always `:latest`; rebuilding overwrites it in place.
    pub fn reference(&self) -> String {
        format!("{}/{}/{}:latest", self.registry, self.project, self.service)
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

/// Identifier of a built image, as reported by the docker CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageId(String);

impl ImageId {
    /// Accepts the short or full id, with or without a `sha256:` prefix.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix("sha256:").unwrap_or(trimmed);
        let valid = (12..=64).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(DeployError::InvalidImageId {
                value: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The container contract of the packaged service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Base image to build from
    #[serde(default = "default_base_image")]
    pub base_image: String,

    /// Application directory inside the image
    #[serde(default = "default_app_home")]
    pub app_home: String,

    /// Port the service listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Non-root user and group the service runs as
    #[serde(default = "default_user")]
    pub user: String,

    /// Python module the container starts
    #[serde(default = "default_entrypoint_module")]
    pub entrypoint_module: String,
}

fn default_base_image() -> String {
    "python:3.9-slim".to_string()
}
fn default_app_home() -> String {
    "/app".to_string()
}
fn default_port() -> u16 {
    SERVICE_PORT
}
fn default_user() -> String {
    RUNTIME_USER.to_string()
}
fn default_entrypoint_module() -> String {
    ENTRYPOINT_MODULE.to_string()
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            app_home: default_app_home(),
            port: default_port(),
            user: default_user(),
            entrypoint_module: default_entrypoint_module(),
        }
    }
}

impl ImageSpec {
    /// The entrypoint argv: `python -m <module>`.
    pub fn entrypoint(&self) -> Vec<String> {
        vec![
            "python".to_string(),
            "-m".to_string(),
            self.entrypoint_module.clone(),
        ]
    }

    /// Render the Dockerfile for this contract. Deterministic: the same
    /// spec always renders byte-identical output.
    pub fn render_dockerfile(&self) -> String {
        let lines = [
            format!("FROM {}", self.base_image),
            String::new(),
            "ENV PYTHONUNBUFFERED True".to_string(),
            format!("ENV APP_HOME {}", self.app_home),
            "WORKDIR $APP_HOME".to_string(),
            String::new(),
            "COPY . ./".to_string(),
            "RUN pip install --no-cache-dir -r requirements.txt".to_string(),
            String::new(),
            format!(
                "RUN groupadd -r {user} && useradd -r -g {user} {user}",
                user = self.user
            ),
            format!("USER {}", self.user),
            String::new(),
            format!("EXPOSE {}", self.port),
            format!(
                "ENTRYPOINT [\"python\", \"-m\", \"{}\"]",
                self.entrypoint_module
            ),
        ];
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Check an inspected image against this contract.
    pub fn verify(&self, image: &InspectedImage) -> Result<()> {
        let entrypoint = &image.config.entrypoint;
        if *entrypoint != self.entrypoint() {
            return Err(DeployError::ContractViolation {
                detail: format!(
                    "entrypoint is {:?}, expected {:?}",
                    entrypoint,
                    self.entrypoint()
                ),
            });
        }

        let user = image.config.user.trim();
        if user.is_empty() || user == "root" || user == "0" {
            return Err(DeployError::ContractViolation {
                detail: "image runs as root".to_string(),
            });
        }
        if user != self.user {
            return Err(DeployError::ContractViolation {
                detail: format!("image runs as {user:?}, expected {:?}", self.user),
            });
        }

        let port_key = format!("{}/tcp", self.port);
        if !image.config.exposed_ports.contains_key(&port_key) {
            return Err(DeployError::ContractViolation {
                detail: format!("port {port_key} not exposed"),
            });
        }

        Ok(())
    }
}

/// One image record from `docker image inspect`.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectedImage {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Config")]
    pub config: InspectedConfig,
}

/// Runtime configuration section of an inspect record.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectedConfig {
    #[serde(rename = "User", default)]
    pub user: String,

    #[serde(rename = "Entrypoint", default)]
    pub entrypoint: Vec<String>,

    #[serde(rename = "ExposedPorts", default)]
    pub exposed_ports: HashMap<String, serde_json::Value>,
}

/// Parse `docker image inspect` output (a JSON array of records).
pub fn parse_inspect(raw: &str) -> Result<InspectedImage> {
    let mut records: Vec<InspectedImage> = serde_json::from_str(raw)?;
    if records.is_empty() {
        return Err(DeployError::ContractViolation {
            detail: "inspect returned no image records".to_string(),
        });
    }
    Ok(records.remove(0))
}
