//! External build tools driven as child processes.
//!
//! This crate wraps the two CLIs the deployment pipeline shells out to:
//! - poetry: dependency lock refresh and plain requirements export
//! - docker: image build, tag lookup, registry push, local run

mod command;
mod engine;
mod poetry;

pub use command::{CommandError, Invocation, Result};
pub use engine::DockerCli;
pub use poetry::{PoetryCli, REQUIREMENTS_FILE};
