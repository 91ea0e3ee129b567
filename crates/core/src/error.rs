//! Error taxonomy for the deployment pipeline.

use std::path::PathBuf;

use deployer_docker::CommandError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("build tool failed: {0}")]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no image id recorded at {path} (run build-docker-image first)")]
    MissingImageId { path: PathBuf },

    #[error("invalid image id {value:?}")]
    InvalidImageId { value: String },

    #[error("image {tag} not found after build")]
    ImageNotFound { tag: String },

    #[error("image does not satisfy the container contract: {detail}")]
    ContractViolation { detail: String },

    #[error("unexpected docker inspect output: {0}")]
    InspectParse(#[from] serde_json::Error),
}

impl DeployError {
    /// Exit status for the CLI. Child exit codes propagate, everything
    /// else maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::Command(CommandError::NonZero { status, .. }) if *status > 0 => *status,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_propagates_child_status() {
        let err = DeployError::Command(CommandError::NonZero {
            command: "docker push tag".to_string(),
            status: 125,
        });
        assert_eq!(err.exit_code(), 125);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        let err = DeployError::MissingImageId {
            path: PathBuf::from(".dockeriid"),
        };
        assert_eq!(err.exit_code(), 1);

        let signal = DeployError::Command(CommandError::NonZero {
            command: "docker build".to_string(),
            status: -1,
        });
        assert_eq!(signal.exit_code(), 1);
    }
}
