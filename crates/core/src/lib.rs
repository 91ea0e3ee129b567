//! Deployment pipeline core.
//!
//! This crate provides the orchestration for shipping the liquidation bot
//! container:
//! - Deployment profiles with environment overlay
//! - The image contract (tag, id, Dockerfile rendering, inspect check)
//! - The `.dockeriid` marker artifact
//! - Sequential fail-fast pipelines and their concrete steps
//! - The `Deployer` orchestrator the CLI drives

mod artifact;
pub mod config;
mod deployer;
mod error;
mod image;
mod pipeline;
mod steps;

pub use artifact::{ImageIdFile, IMAGE_ID_FILE};
pub use config::{
    apply_env_overrides, builtin_profile, load_deployment, DeploymentConfig, DeploymentDetails,
    MonitorDetails, DEFAULT_DEPLOYMENT,
};
pub use deployer::Deployer;
pub use error::{DeployError, Result};
pub use image::{
    parse_inspect, ImageId, ImageSpec, ImageTag, InspectedConfig, InspectedImage,
    ENTRYPOINT_MODULE, RUNTIME_USER, SERVICE_PORT,
};
pub use pipeline::{Pipeline, PipelineStep};
pub use steps::{
    BuildImage, EnsureDockerfile, ExportRequirements, PushImage, RecordImageId, StartContainer,
    UpgradeDependencies, VerifyImageContract,
};
