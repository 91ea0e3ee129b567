//! Deployment pipeline CLI for the liquidation bot container.
//!
//! One subcommand per operation:
//! - upgrade-dependencies: refresh locked dependency versions
//! - build-docker-image: export deps, build, record the image id
//! - push-image-to-container-registry: build, then push the tag
//! - start: build, then run the image locally
//! - monitor: fixed-interval liveness poll of the deployed service

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deployer_core::{load_deployment, DeployError, Deployer};

#[derive(Parser, Debug)]
#[command(
    name = "deployer",
    version,
    about = "Build, ship, and watch the liquidation bot container"
)]
struct Cli {
    /// Deployment profile (falls back to $DEPLOYMENT, then "liquidation-bot")
    #[arg(short, long, global = true)]
    deployment: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh locked dependency versions of the packaged service
    UpgradeDependencies,

    /// Export locked deps, build the image, record its id to .dockeriid
    BuildDockerImage,

    /// Build, then push the tagged image to the container registry
    PushImageToContainerRegistry,

    /// Build, then run the recorded image locally with the service port published
    Start,

    /// Poll the deployed service's HTTP endpoint on a fixed interval
    Monitor {
        /// Service URL (defaults to the profile's monitor url)
        #[arg(long)]
        url: Option<String>,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,deployer_core=debug,deployer_docker=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_deployment(cli.deployment.as_deref())?;
    let deployer = Deployer::new(config);

    let result = match cli.command {
        Command::UpgradeDependencies => deployer.upgrade_dependencies().await,
        Command::BuildDockerImage => deployer.build_image().await,
        Command::PushImageToContainerRegistry => deployer.push_image().await,
        Command::Start => deployer.start().await,
        Command::Monitor { url, interval } => deployer.monitor(url, interval).await,
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "Operation failed");
        // child exit codes propagate, the way make surfaced them
        let code = err
            .downcast_ref::<DeployError>()
            .map(DeployError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }

    Ok(())
}
