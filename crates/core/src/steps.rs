//! Concrete pipeline steps for the build, push, and start chains.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use deployer_docker::{DockerCli, PoetryCli};

use crate::artifact::ImageIdFile;
use crate::error::{DeployError, Result};
use crate::image::{parse_inspect, ImageId, ImageSpec, ImageTag};
use crate::pipeline::PipelineStep;

/// Refresh locked dependency versions in the build context.
pub struct UpgradeDependencies {
    pub poetry: PoetryCli,
    pub context: PathBuf,
}

#[async_trait]
impl PipelineStep for UpgradeDependencies {
    fn name(&self) -> &str {
        "upgrade-dependencies"
    }

    async fn run(&self) -> Result<()> {
        self.poetry.upgrade(&self.context).await?;
        Ok(())
    }
}

/// Export the lock to `requirements.txt` in the build context.
pub struct ExportRequirements {
    pub poetry: PoetryCli,
    pub context: PathBuf,
}

#[async_trait]
impl PipelineStep for ExportRequirements {
    fn name(&self) -> &str {
        "export-requirements"
    }

    async fn run(&self) -> Result<()> {
        self.poetry.export(&self.context).await?;
        Ok(())
    }
}

/// Render the image contract into a Dockerfile when the context has none.
pub struct EnsureDockerfile {
    pub spec: ImageSpec,
    pub context: PathBuf,
}

#[async_trait]
impl PipelineStep for EnsureDockerfile {
    fn name(&self) -> &str {
        "ensure-dockerfile"
    }

    async fn run(&self) -> Result<()> {
        let path = self.context.join("Dockerfile");
        if path.exists() {
            debug!(path = %path.display(), "Dockerfile present");
            return Ok(());
        }
        std::fs::write(&path, self.spec.render_dockerfile())?;
        info!(path = %path.display(), "Rendered Dockerfile");
        Ok(())
    }
}

/// Build the image tagged `:latest`.
pub struct BuildImage {
    pub docker: DockerCli,
    pub tag: ImageTag,
    pub context: PathBuf,
}

#[async_trait]
impl PipelineStep for BuildImage {
    fn name(&self) -> &str {
        "build-image"
    }

    async fn run(&self) -> Result<()> {
        self.docker.build(&self.tag.reference(), &self.context).await?;
        Ok(())
    }
}

/// Check the built image against the container contract.
pub struct VerifyImageContract {
    pub docker: DockerCli,
    pub tag: ImageTag,
    pub spec: ImageSpec,
}

#[async_trait]
impl PipelineStep for VerifyImageContract {
    fn name(&self) -> &str {
        "verify-image-contract"
    }

    async fn run(&self) -> Result<()> {
        let raw = self.docker.inspect(&self.tag.reference()).await?;
        let image = parse_inspect(&raw)?;
        self.spec.verify(&image)?;
        info!(tag = %self.tag, "Image satisfies the container contract");
        Ok(())
    }
}

/// Resolve the built image id and persist it to the marker file.
pub struct RecordImageId {
    pub docker: DockerCli,
    pub tag: ImageTag,
    pub artifact: ImageIdFile,
}

#[async_trait]
impl PipelineStep for RecordImageId {
    fn name(&self) -> &str {
        "record-image-id"
    }

    async fn run(&self) -> Result<()> {
        let raw = self
            .docker
            .image_id(&self.tag.reference())
            .await?
            .ok_or_else(|| DeployError::ImageNotFound {
                tag: self.tag.reference(),
            })?;
        let id = ImageId::parse(&raw)?;
        self.artifact.write(&id)?;
        info!(
            image_id = %id,
            path = %self.artifact.path().display(),
            "Recorded image id"
        );
        Ok(())
    }
}

/// Push the tag to the remote registry.
///
/// Reads the marker file first: a push with no recorded build is refused.
pub struct PushImage {
    pub docker: DockerCli,
    pub tag: ImageTag,
    pub artifact: ImageIdFile,
}

#[async_trait]
impl PipelineStep for PushImage {
    fn name(&self) -> &str {
        "push-image"
    }

    async fn run(&self) -> Result<()> {
        let id = self.artifact.read()?;
        info!(image_id = %id, tag = %self.tag, "Pushing recorded image");
        self.docker.push(&self.tag.reference()).await?;
        Ok(())
    }
}

/// Run the recorded image locally with the service port published.
pub struct StartContainer {
    pub docker: DockerCli,
    pub artifact: ImageIdFile,
    pub host_port: u16,
    pub container_port: u16,
}

#[async_trait]
impl PipelineStep for StartContainer {
    fn name(&self) -> &str {
        "start-container"
    }

    async fn run(&self) -> Result<()> {
        let id = self.artifact.read()?;
        self.docker
            .run(id.as_str(), self.host_port, self.container_port)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_refuses_without_image_id() {
        let dir = tempfile::tempdir().unwrap();
        let step = PushImage {
            docker: DockerCli::new(),
            tag: ImageTag::new("eu.gcr.io", "proj", "svc"),
            artifact: ImageIdFile::in_dir(dir.path()),
        };

        // fails before ever touching docker
        let err = step.run().await.unwrap_err();
        assert!(matches!(err, DeployError::MissingImageId { .. }));
    }

    #[tokio::test]
    async fn test_start_refuses_without_image_id() {
        let dir = tempfile::tempdir().unwrap();
        let step = StartContainer {
            docker: DockerCli::new(),
            artifact: ImageIdFile::in_dir(dir.path()),
            host_port: 8080,
            container_port: 8080,
        };

        let err = step.run().await.unwrap_err();
        assert!(matches!(err, DeployError::MissingImageId { .. }));
    }

    #[tokio::test]
    async fn test_ensure_dockerfile_renders_once() {
        let dir = tempfile::tempdir().unwrap();
        let step = EnsureDockerfile {
            spec: ImageSpec::default(),
            context: dir.path().to_path_buf(),
        };

        step.run().await.unwrap();
        let path = dir.path().join("Dockerfile");
        let rendered = std::fs::read_to_string(&path).unwrap();
        assert!(rendered.contains("ENTRYPOINT [\"python\", \"-m\", \"liquidation_bot\"]"));

        // an existing Dockerfile is left alone
        std::fs::write(&path, "FROM scratch\n").unwrap();
        step.run().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "FROM scratch\n");
    }
}
