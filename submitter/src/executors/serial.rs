use super::{Executor, ExecutorError, Submission};
use crate::{dispatch::Dispatcher, job::Batch};
use tracing::{instrument, warn};

/// Executor that runs every command in place, one after the other
///
/// No wrapper scripts are written, commands inherit this process' stdio.
#[derive(Debug)]
pub struct SerialExecutor {
    dispatcher: Dispatcher,
}

impl SerialExecutor {
    pub fn load(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl Executor for SerialExecutor {
    #[instrument(skip_all, level = "info", fields(jobs = batch.len()))]
    fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError> {
        for job in batch.jobs() {
            // a failing job doesn't stop the ones after it
            if let Err(error) = self.dispatcher.run(&job.command) {
                warn!(label = %job.label, error = %error, "Job failed");
            }
        }

        Ok(Submission::Local {
            jobs: batch.len(),
            peak_running: usize::from(!self.dispatcher.is_dry()),
        })
    }
}
