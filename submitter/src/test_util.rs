use crate::{
    config::SubmitterConfig,
    dispatch::{CommandRunner, Dispatcher},
};
use std::{
    cell::RefCell,
    io,
    os::unix::process::ExitStatusExt,
    path::Path,
    process::ExitStatus,
    rc::Rc,
};

/// Remembers every command instead of running it, reporting `status` for each
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    pub commands: Rc<RefCell<Vec<String>>>,
    pub status: i32,
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &str) -> io::Result<ExitStatus> {
        self.commands.borrow_mut().push(command.to_string());
        // raw wait status, the exit code sits in the second byte
        Ok(ExitStatus::from_raw(self.status << 8))
    }
}

pub fn recording_dispatcher(dry: bool) -> (Dispatcher, Rc<RefCell<Vec<String>>>) {
    let runner = RecordingRunner::default();
    let commands = runner.commands.clone();

    (Dispatcher::with_runner(dry, Box::new(runner)), commands)
}

pub fn submitter_config(job_dir: &Path) -> SubmitterConfig {
    SubmitterConfig {
        job_dir: job_dir.to_path_buf(),
        username: Some(String::from("alice")),
        userid: Some(1234),
        ..SubmitterConfig::default()
    }
}
