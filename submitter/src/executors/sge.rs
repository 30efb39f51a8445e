use super::{prepare_job_dir, Executor, ExecutorError, Submission};
use crate::{
    config::SubmitterConfig,
    descriptor::format_memory,
    dispatch::{Dispatcher, Route, Site, SGE_HOST, UMD_GATEWAY},
    job::Batch,
    limiter::render_backpressure_guard,
    script::{WrapperOptions, WrapperScript},
};
use once_cell::sync::Lazy;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// Cluster wide SGE environment, sourced before any `qsub`
pub static SGE_SETTINGS: Lazy<PathBuf> =
    Lazy::new(|| PathBuf::from("/data/sge/current/icecube/common/settings.sh"));

/// Sentinels present from the start so the guard's globs always match
pub const PLACEHOLDERS: [&str; 2] = ["placeholder.o", "placeholder.queue"];

/// Executor for the SGE cluster behind cobol00
///
/// SGE has no ceiling on queued jobs, so the generated `cobol00_qsub.sh` sequence carries its
/// own backpressure guard and is sourced on cobol00 as a whole.
#[derive(Debug)]
pub struct SgeExecutor {
    config: SubmitterConfig,
    site: Site,
    dispatcher: Dispatcher,
}

impl SgeExecutor {
    pub fn load(config: SubmitterConfig, site: Site, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            site,
            dispatcher,
        }
    }

    /// `qsub` invocation for one wrapper, output lands next to it
    pub fn qsub_command(job_dir: &Path, script: &Path) -> String {
        format!(
            "qsub -q all.q -e {0} -o {0} {1}",
            job_dir.display(),
            script.display()
        )
    }

    /// Command that sources the submission sequence on cobol00
    pub fn submit_command(&self, sequence: &Path) -> String {
        match self.site {
            Site::Cobol00 => format!(". {}", sequence.display()),
            _ => Route::TwoHops {
                gateway: UMD_GATEWAY,
                host: SGE_HOST,
                username: self.config.username.clone(),
            }
            .wrap(&format!("source {}", sequence.display())),
        }
    }
}

/// Lines of the generated submission sequence
#[derive(Debug, Clone, Default)]
struct Sequence {
    lines: Vec<String>,
}

impl Sequence {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn write(&self, path: &Path) -> std::io::Result<()> {
        let mut content = self.lines.join("\n");
        content.push('\n');
        fs::write(path, content)
    }
}

impl Executor for SgeExecutor {
    #[instrument(skip_all, level = "info", fields(jobs = batch.len()))]
    fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError> {
        let job_dir = prepare_job_dir(batch)?;
        let sequence_path = job_dir.join("cobol00_qsub.sh");
        let mut sequence = Sequence::default();

        sequence.push(format!(". {}", SGE_SETTINGS.display()));
        for placeholder in PLACEHOLDERS {
            File::create(job_dir.join(placeholder))?;
        }
        info!("Submitting jobs from {} ...", job_dir.display());

        for (n, job) in batch.jobs().iter().enumerate() {
            let script_path = job_dir.join(format!("cobol00_{}.sh", job.label));
            let qsub = Self::qsub_command(&job_dir, &script_path);

            let mut directives = vec![format!("# {qsub}")];
            if let Some(memory) = self.config.memory.filter(|memory| *memory > 0.0) {
                directives.push(format!("#$ -l h_vmem={}", format_memory(memory)));
            }
            let options = WrapperOptions {
                directives,
                skip_env: false,
            };
            WrapperScript::render(job, &self.config, &options)?.write(&script_path)?;

            sequence.push(format!("touch {}.queue", script_path.display()));
            if let Some(max_jobs) = self.config.max_jobs {
                if n >= 1 {
                    sequence.push(render_backpressure_guard(&job_dir, max_jobs));
                }
            }
            sequence.push(qsub);
            if self.config.delay > 0.0 {
                sequence.push(format!("sleep {:.0}", self.config.delay));
            }
        }
        sequence.write(&sequence_path)?;

        let command = self.submit_command(&sequence_path);
        self.dispatcher.run(&command)?;

        Ok(Submission::Remote {
            jobs: batch.len(),
            command,
        })
    }
}
