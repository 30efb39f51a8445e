use super::{prepare_job_dir, Executor, ExecutorError, Submission};
use crate::{
    config::SubmitterConfig,
    dispatch::Dispatcher,
    job::{Batch, Job},
    limiter::{ProcessSlots, POLL_INTERVAL},
    script::{WrapperOptions, WrapperScript},
};
use std::{
    fs::File,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
    time::Duration,
};
use tracing::{debug, info, instrument};

/// Executor that runs jobs as child processes of this one
///
/// Every job gets a `threads_<label>.sh` wrapper, spawned with its stdout and stderr sent to
/// `threads_<label>.out` and `threads_<label>.err`. At most `max_jobs` wrappers run at once.
#[derive(Debug)]
pub struct LocalExecutor {
    config: SubmitterConfig,
    dispatcher: Dispatcher,
    poll_interval: Duration,
}

impl LocalExecutor {
    pub fn load(config: SubmitterConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl LocalExecutor {
    /// Spawn every wrapper in order, holding back while all slots are taken
    fn spawn_all(
        &self,
        job_dir: &Path,
        scripts: &[(&Job, PathBuf)],
        slots: &mut ProcessSlots,
    ) -> Result<(), ExecutorError> {
        for (job, script_path) in scripts {
            slots.wait_for_slot();

            let stdout = File::create(job_dir.join(format!("threads_{}.out", job.label)))?;
            let stderr = File::create(job_dir.join(format!("threads_{}.err", job.label)))?;
            let child = Command::new("sh")
                .arg(script_path)
                .stdin(Stdio::null())
                .stdout(stdout)
                .stderr(stderr)
                .spawn()?;
            debug!(label = %job.label, pid = child.id(), "Spawned job");
            slots.track(job.label.clone(), child);

            if self.config.delay > 0.0 {
                thread::sleep(Duration::from_secs_f64(self.config.delay));
            }
        }

        Ok(())
    }
}

impl Executor for LocalExecutor {
    /// write all wrappers, spawn them with a bounded number running, then wait for all of them
    #[instrument(skip_all, level = "info", fields(jobs = batch.len()))]
    fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError> {
        let job_dir = prepare_job_dir(batch)?;
        let options = WrapperOptions::default();

        let mut scripts = Vec::with_capacity(batch.len());
        for job in batch.jobs() {
            let script_path = job_dir.join(format!("threads_{}.sh", job.label));
            WrapperScript::render(job, &self.config, &options)?.write(&script_path)?;

            self.dispatcher.announce(&format!("sh {}", script_path.display()));
            scripts.push((job, script_path));
        }

        if self.dispatcher.is_dry() {
            info!("Prepared {} jobs in {} .", batch.len(), job_dir.display());

            return Ok(Submission::Local {
                jobs: batch.len(),
                peak_running: 0,
            });
        }

        let mut slots =
            ProcessSlots::new(self.config.max_jobs).with_poll_interval(self.poll_interval);
        let spawned = self.spawn_all(&job_dir, &scripts, &mut slots);
        // children already running are waited on even when a later spawn failed
        slots.wait_all();
        spawned?;

        Ok(Submission::Local {
            jobs: batch.len(),
            peak_running: slots.peak(),
        })
    }
}
