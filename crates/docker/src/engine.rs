//! Docker CLI driver: build, tag lookup, inspect, push, local run.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::command::{Invocation, Result};

/// Timeout for short metadata queries (`images -q`, `image inspect`).
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Docker CLI driver.
///
/// Builds, pushes, and runs inherit the parent's stdio so the tool's own
/// progress output reaches the operator, the way the make targets did.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Use a different executable. Test hook.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the context into an image tagged `tag`, overwriting any
    /// previous image under the same tag.
    pub async fn build(&self, tag: &str, context: &Path) -> Result<()> {
        info!(tag, context = %context.display(), "Building image");
        Invocation::new(&self.program)
            .args(build_args(tag))
            .current_dir(context)
            .status()
            .await
    }

    /// Resolve the id of the image currently holding `tag`.
    ///
    /// `None` when no such image exists.
    pub async fn image_id(&self, tag: &str) -> Result<Option<String>> {
        let stdout = Invocation::new(&self.program)
            .args(images_query_args(tag))
            .timeout(QUERY_TIMEOUT)
            .output()
            .await?;
        Ok(stdout
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    /// Raw `docker image inspect` JSON for `tag`.
    pub async fn inspect(&self, tag: &str) -> Result<String> {
        Invocation::new(&self.program)
            .args(inspect_args(tag))
            .timeout(QUERY_TIMEOUT)
            .output()
            .await
    }

    /// Push `tag` to its registry. Credentials are the docker CLI's ambient
    /// credentials.
    pub async fn push(&self, tag: &str) -> Result<()> {
        info!(tag, "Pushing image");
        Invocation::new(&self.program)
            .args(push_args(tag))
            .status()
            .await
    }

    /// Run an image in the foreground with one port published. Returns when
    /// the container exits.
    pub async fn run(&self, image: &str, host_port: u16, container_port: u16) -> Result<()> {
        info!(image, host_port, container_port, "Running container");
        Invocation::new(&self.program)
            .args(run_args(image, host_port, container_port))
            .status()
            .await
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

fn build_args(tag: &str) -> Vec<String> {
    vec![
        "build".to_string(),
        "-t".to_string(),
        tag.to_string(),
        ".".to_string(),
    ]
}

fn images_query_args(tag: &str) -> Vec<String> {
    vec!["images".to_string(), "-q".to_string(), tag.to_string()]
}

fn inspect_args(tag: &str) -> Vec<String> {
    vec![
        "image".to_string(),
        "inspect".to_string(),
        tag.to_string(),
    ]
}

fn push_args(tag: &str) -> Vec<String> {
    vec!["push".to_string(), tag.to_string()]
}

fn run_args(image: &str, host_port: u16, container_port: u16) -> Vec<String> {
    vec![
        "run".to_string(),
        "--rm".to_string(),
        "-p".to_string(),
        format!("{host_port}:{container_port}"),
        image.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        assert_eq!(
            build_args("eu.gcr.io/proj/svc:latest"),
            vec!["build", "-t", "eu.gcr.io/proj/svc:latest", "."]
        );
    }

    #[test]
    fn test_images_query_args() {
        assert_eq!(
            images_query_args("eu.gcr.io/proj/svc:latest"),
            vec!["images", "-q", "eu.gcr.io/proj/svc:latest"]
        );
    }

    #[test]
    fn test_run_args_publishes_port() {
        assert_eq!(
            run_args("abc123def456", 8080, 8080),
            vec!["run", "--rm", "-p", "8080:8080", "abc123def456"]
        );
    }

    #[test]
    fn test_push_args() {
        assert_eq!(push_args("tag:latest"), vec!["push", "tag:latest"]);
    }

    #[tokio::test]
    async fn test_image_id_empty_output() {
        // `true` prints nothing; an empty listing means no image
        let id = DockerCli::with_program("true")
            .image_id("missing:latest")
            .await
            .unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_image_id_takes_first_line() {
        // stale tags can list more than one id; only the first is taken
        let out = crate::command::Invocation::new("sh")
            .args(["-c", "echo 'abc123def456\nfeed00beef00'"])
            .output()
            .await
            .unwrap();
        let first = out
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|id| !id.is_empty());
        assert_eq!(first.as_deref(), Some("abc123def456"));
    }
}
