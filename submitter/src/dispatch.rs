//! Deciding where the final submission command runs and running it there

use std::{
    io,
    process::{Command, ExitStatus},
};
use thiserror::Error;
use tracing::{error, info};

/// Login host in front of the UMD clusters
pub const UMD_GATEWAY: &str = "pa-pub.umd.edu";
/// Login host in front of the IceCube pool
pub const ICECUBE_GATEWAY: &str = "pub.icecube.wisc.edu";
pub const SGE_HOST: &str = "cobol00";
pub const CONDOR00_HOST: &str = "condor00";
pub const NPX4_HOST: &str = "submit";
pub const OSG_HOST: &str = "sub-1";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to launch `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with status {code:?}")]
    Failed { command: String, code: Option<i32> },
}

/// Routing class of the host the submission starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Cobol00,
    Condor00,
    IceCubeSubmit,
    Cobalt,
    Elsewhere,
}

/// Classify a host name, independent of where this process actually runs
pub fn classify_host(name: &str) -> Site {
    if name == "cobol00" {
        Site::Cobol00
    } else if name.contains("condor00") {
        Site::Condor00
    } else if name.contains("submit-1") {
        Site::IceCubeSubmit
    } else if name.contains("cobalt") {
        Site::Cobalt
    } else {
        Site::Elsewhere
    }
}

/// Name of the host this process runs on
pub fn current_hostname() -> io::Result<String> {
    match nix::unistd::gethostname() {
        Ok(hostname) => Ok(hostname.to_string_lossy().into_owned()),
        Err(errno) => {
            error!(error = ?errno, "Failed to retrieve hostname");

            Err(io::Error::from(errno))
        }
    }
}

/// How a command reaches the scheduler host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    InPlace,
    OneHop {
        host: &'static str,
    },
    TwoHops {
        gateway: &'static str,
        host: &'static str,
        username: Option<String>,
    },
}

impl Route {
    /// Wrap `command` in as many remote logins as the route needs
    pub fn wrap(&self, command: &str) -> String {
        match self {
            Self::InPlace => command.to_string(),
            Self::OneHop { host } => format!("ssh {host} \"{command}\""),
            Self::TwoHops {
                gateway,
                host,
                username,
            } => {
                let user = username
                    .as_ref()
                    .map(|name| format!("{name}@"))
                    .unwrap_or_default();

                format!("ssh {user}{gateway} \"ssh {host} '{command} ' \"")
            }
        }
    }
}

/// Something that can run a shell command line to completion
pub trait CommandRunner {
    fn run(&mut self, command: &str) -> io::Result<ExitStatus>;
}

/// Runs commands through `sh -c`, inheriting stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl CommandRunner for SystemShell {
    fn run(&mut self, command: &str) -> io::Result<ExitStatus> {
        Command::new("sh").arg("-c").arg(command).status()
    }
}

/// Announces commands and, unless dry, runs them
pub struct Dispatcher {
    dry: bool,
    runner: Box<dyn CommandRunner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("dry", &self.dry).finish()
    }
}

impl Dispatcher {
    pub fn new(dry: bool) -> Self {
        Self::with_runner(dry, Box::new(SystemShell))
    }

    pub fn with_runner(dry: bool, runner: Box<dyn CommandRunner>) -> Self {
        Self { dry, runner }
    }

    pub fn is_dry(&self) -> bool {
        self.dry
    }

    pub fn announce(&self, command: &str) {
        if self.dry {
            info!("***** Would execute command:");
        }
        info!("$ {command}");
    }

    /// Run `command`; only its exit status is known to us
    pub fn run(&mut self, command: &str) -> Result<(), DispatchError> {
        self.announce(command);
        if self.dry {
            return Ok(());
        }

        let status = self
            .runner
            .run(command)
            .map_err(|source| DispatchError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DispatchError::Failed {
                command: command.to_string(),
                code: status.code(),
            })
        }
    }
}
