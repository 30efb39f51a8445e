//! Bounding the number of jobs in flight
//!
//! Locally spawned jobs are counted by polling their process handles. Schedulers without a
//! native ceiling get a guard baked into the generated submission sequence instead, which the
//! remote shell evaluates before each submission.

use crate::spinner::Spinner;
use std::{
    path::{Path, PathBuf},
    process::{Child, ExitStatus},
    thread,
    time::Duration,
};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Added to the ceiling to cover `placeholder.o` and `placeholder.queue`
pub const SENTINEL_SLACK: usize = 2;

/// Seconds between re-evaluations of the remote guard
pub const GUARD_INTERVAL: u64 = 10;

/// Time between polls of local process handles
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Produces a shell snippet that blocks until fewer than `ceiling` jobs are active
pub trait BackpressureGuard {
    fn render(&self, ceiling: usize) -> String;
}

/// Counts `*.queue` markers touched before each submission against `End: ` lines found at the
/// tail of scheduler output files
#[derive(Debug, Clone)]
pub struct MarkerFileGuard {
    pub job_dir: PathBuf,
}

impl BackpressureGuard for MarkerFileGuard {
    fn render(&self, ceiling: usize) -> String {
        let dir = self.job_dir.display();

        format!(
            "while test $(expr `ls {dir}/*.queue | wc -l` - `tail -n1 {dir}/*.o* | grep '^End: ' | wc -l`) -ge {}; do sleep {GUARD_INTERVAL}; done",
            ceiling + SENTINEL_SLACK
        )
    }
}

/// The guard used for SGE style submission sequences
pub fn render_backpressure_guard(job_dir: &Path, ceiling: usize) -> String {
    MarkerFileGuard {
        job_dir: job_dir.to_path_buf(),
    }
    .render(ceiling)
}

/// Local child processes, polled for liveness
#[derive(Debug)]
pub struct ProcessSlots {
    ceiling: Option<usize>,
    poll_interval: Duration,
    children: Vec<(String, Child)>,
    peak: usize,
}

impl ProcessSlots {
    /// A ceiling of 0 is the same as none
    pub fn new(ceiling: Option<usize>) -> Self {
        Self {
            ceiling: ceiling.filter(|ceiling| *ceiling > 0),
            poll_interval: POLL_INTERVAL,
            children: Vec::new(),
            peak: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Number of children that have not exited yet, finished ones are dropped
    pub fn running(&mut self) -> usize {
        self.children.retain_mut(|(label, child)| match child.try_wait() {
            Ok(Some(status)) => {
                report_exit(label.as_str(), status);
                false
            }
            Ok(None) => true,
            Err(error) => {
                warn!(label = %label, error = ?error, "Failed to poll job, treating it as finished");
                false
            }
        });

        self.children.len()
    }

    pub fn is_full(&mut self) -> bool {
        match self.ceiling {
            Some(ceiling) => self.running() >= ceiling,
            None => false,
        }
    }

    /// Block until a slot is free
    pub fn wait_for_slot(&mut self) {
        if !self.is_full() {
            return;
        }

        info!("waiting for available thread...");
        let mut spinner = Spinner::stderr();
        spinner.start();
        self.pause();
        while self.is_full() {
            self.pause();
            spinner.next();
        }
        spinner.finish();
        info!("submitting now.");
    }

    /// Take ownership of a freshly spawned child
    pub fn track(&mut self, label: impl Into<String>, child: Child) {
        self.children.push((label.into(), child));

        let running = self.running();
        if running > self.peak {
            self.peak = running;
        }
    }

    /// Block until every tracked child has exited
    pub fn wait_all(&mut self) {
        if self.running() == 0 {
            return;
        }

        info!("waiting for threads to finish...");
        let mut spinner = Spinner::stderr();
        spinner.start();
        while self.running() > 0 {
            self.pause();
            spinner.next();
        }
        spinner.finish();
        info!("threads finished.");
    }

    /// Highest number of simultaneously running children seen right after a spawn
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Sleep for one poll interval, waking early if the oldest running child exits
    fn pause(&mut self) {
        match self.children.first_mut() {
            Some((label, child)) => match child.wait_timeout(self.poll_interval) {
                Ok(Some(status)) => {
                    debug!(label = %label, code = ?status.code(), "Job exited while waiting")
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(label = %label, error = ?error, "Failed to wait on job");
                    thread::sleep(self.poll_interval);
                }
            },
            None => thread::sleep(self.poll_interval),
        }
    }
}

fn report_exit(label: &str, status: ExitStatus) {
    if status.success() {
        debug!(label = %label, "Job finished");
    } else {
        info!(label = %label, code = ?status.code(), "Job exited unsuccessfully");
    }
}
