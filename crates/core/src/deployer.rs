//! Top-level orchestration of the deployment operations.
//!
//! One `Deployer` per resolved deployment profile. Push and start depend on
//! a build in the same invocation, so their chains share the build chain as
//! a prefix, the way the make targets chained their prerequisites.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use deployer_api::{LivenessMonitor, MonitorClient};
use deployer_docker::{DockerCli, PoetryCli};

use crate::artifact::ImageIdFile;
use crate::config::DeploymentConfig;
use crate::error::DeployError;
use crate::pipeline::Pipeline;
use crate::steps::{
    BuildImage, EnsureDockerfile, ExportRequirements, PushImage, RecordImageId, StartContainer,
    UpgradeDependencies, VerifyImageContract,
};

/// Drives the deployment pipeline for one deployment profile.
pub struct Deployer {
    config: DeploymentConfig,
    docker: DockerCli,
    poetry: PoetryCli,
}

impl Deployer {
    pub fn new(config: DeploymentConfig) -> Self {
        Self {
            config,
            docker: DockerCli::new(),
            poetry: PoetryCli::new(),
        }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    fn context(&self) -> PathBuf {
        PathBuf::from(&self.config.deployment.context)
    }

    fn artifact(&self) -> ImageIdFile {
        ImageIdFile::in_dir(&self.context())
    }

    /// The build chain shared by `build`, `push`, and `start`.
    fn build_chain(&self, name: &str) -> Pipeline {
        let tag = self.config.image_tag();
        Pipeline::new(name)
            .step(ExportRequirements {
                poetry: self.poetry.clone(),
                context: self.context(),
            })
            .step(EnsureDockerfile {
                spec: self.config.image.clone(),
                context: self.context(),
            })
            .step(BuildImage {
                docker: self.docker.clone(),
                tag: tag.clone(),
                context: self.context(),
            })
            .step(VerifyImageContract {
                docker: self.docker.clone(),
                tag: tag.clone(),
                spec: self.config.image.clone(),
            })
            .step(RecordImageId {
                docker: self.docker.clone(),
                tag,
                artifact: self.artifact(),
            })
    }

    /// `upgrade-dependencies` target.
    pub async fn upgrade_dependencies(&self) -> Result<()> {
        let pipeline = Pipeline::new("upgrade-dependencies").step(UpgradeDependencies {
            poetry: self.poetry.clone(),
            context: self.context(),
        });
        pipeline.run().await?;
        Ok(())
    }

    /// `build-docker-image` target.
    pub async fn build_image(&self) -> Result<()> {
        self.build_chain("build-docker-image").run().await?;
        Ok(())
    }

    /// `push-image-to-container-registry` target. Builds first, in the same
    /// chain.
    pub async fn push_image(&self) -> Result<()> {
        let pipeline = self
            .build_chain("push-image-to-container-registry")
            .step(PushImage {
                docker: self.docker.clone(),
                tag: self.config.image_tag(),
                artifact: self.artifact(),
            });
        pipeline.run().await?;
        Ok(())
    }

    /// `start` target. Builds first, then runs the recorded image in the
    /// foreground with the service port published.
    pub async fn start(&self) -> Result<()> {
        let pipeline = self.build_chain("start").step(StartContainer {
            docker: self.docker.clone(),
            artifact: self.artifact(),
            host_port: self.config.image.port,
            container_port: self.config.image.port,
        });
        pipeline.run().await?;
        Ok(())
    }

    /// `monitor` target: fixed-interval liveness poll of the deployed
    /// service. Runs until the process is terminated.
    pub async fn monitor(
        &self,
        url_override: Option<String>,
        interval_override_secs: Option<u64>,
    ) -> Result<()> {
        let url = url_override
            .or_else(|| self.config.monitor.url.clone())
            .ok_or_else(|| DeployError::Config {
                message: format!(
                    "deployment '{}' has no monitor url",
                    self.config.deployment.name
                ),
            })?;

        let interval_secs = interval_override_secs
            .unwrap_or(self.config.monitor.interval_secs)
            .max(1);
        let poll_interval = Duration::from_secs(interval_secs);

        let client = MonitorClient::new(url, poll_interval)?;
        LivenessMonitor::new(client, poll_interval).run().await
    }
}
