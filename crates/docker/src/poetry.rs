//! Poetry workflows for the packaged service.
//!
//! The image installs from a plain requirements list, so the locked
//! dependency set is exported before every build.

use std::path::Path;

use tracing::info;

use crate::command::{Invocation, Result};

/// File name the lock is exported to, consumed by the Dockerfile.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Poetry CLI driver.
#[derive(Debug, Clone)]
pub struct PoetryCli {
    program: String,
}

impl PoetryCli {
    pub fn new() -> Self {
        Self {
            program: "poetry".to_string(),
        }
    }

    /// Use a different executable. Test hook.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Refresh locked dependency versions (`poetry update`).
    pub async fn upgrade(&self, context: &Path) -> Result<()> {
        info!(context = %context.display(), "Upgrading locked dependencies");
        Invocation::new(&self.program)
            .args(upgrade_args())
            .current_dir(context)
            .status()
            .await
    }

    /// Export the lock to [`REQUIREMENTS_FILE`] in the build context.
    pub async fn export(&self, context: &Path) -> Result<()> {
        info!(
            context = %context.display(),
            output = REQUIREMENTS_FILE,
            "Exporting locked dependencies"
        );
        Invocation::new(&self.program)
            .args(export_args())
            .current_dir(context)
            .status()
            .await
    }
}

impl Default for PoetryCli {
    fn default() -> Self {
        Self::new()
    }
}

fn upgrade_args() -> Vec<String> {
    vec!["update".to_string()]
}

fn export_args() -> Vec<String> {
    [
        "export",
        "-f",
        "requirements.txt",
        "--output",
        REQUIREMENTS_FILE,
        "--without-hashes",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
