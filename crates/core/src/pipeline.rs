//! Sequential fail-fast execution of deployment steps.
//!
//! A chain runs its steps strictly in order; the first failure aborts the
//! remainder and surfaces the step's error unchanged.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::Result;

/// One unit of work in a deployment chain.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Stable step name for logs.
    fn name(&self) -> &str;

    async fn run(&self) -> Result<()>;
}

/// Ordered chain of steps.
pub struct Pipeline {
    name: String,
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl PipelineStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self) -> Result<()> {
        let started = Instant::now();
        info!(pipeline = %self.name, steps = self.steps.len(), "Starting pipeline");

        for (position, step) in self.steps.iter().enumerate() {
            let step_started = Instant::now();
            info!(
                pipeline = %self.name,
                step = step.name(),
                position = position + 1,
                "Running step"
            );

            if let Err(err) = step.run().await {
                error!(
                    pipeline = %self.name,
                    step = step.name(),
                    error = %err,
                    "Step failed, aborting pipeline"
                );
                return Err(err);
            }

            info!(
                step = step.name(),
                elapsed_ms = step_started.elapsed().as_millis() as u64,
                "Step complete"
            );
        }

        info!(
            pipeline = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline complete"
        );
        Ok(())
    }
}
