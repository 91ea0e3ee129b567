//! Deployment profile configuration.
//!
//! This module provides:
//! - Deployment profiles (registry coordinates, image contract, monitor URL)
//! - A loader with built-in profiles, file override, and environment overlay

mod deployment;
mod loader;

pub use deployment::{DeploymentConfig, DeploymentDetails, MonitorDetails};
pub use loader::{
    apply_env_overrides, builtin_profile, env, load_deployment, DEFAULT_DEPLOYMENT,
};
