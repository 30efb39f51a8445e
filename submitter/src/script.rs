//! Render job commands into self-contained shell wrappers

use crate::{config::SubmitterConfig, job::Job};
use serde::Serialize;
use std::{
    fs::{self, Permissions},
    io,
    os::unix::fs::PermissionsExt,
    path::Path,
};
use thiserror::Error;
use tinytemplate::TinyTemplate;
use tracing::debug;

/// included wrapper template
static WRAPPER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/data/templates/wrapper.sh"
));

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to render wrapper script")]
    Render(#[from] tinytemplate::error::Error),
    #[error("Failed to write wrapper script")]
    Write(#[from] io::Error),
}

/// Rendered wrapper for a single job
///
/// The wrapper sources the environment script, reports the host, brackets the command with
/// `Begin:`/`End:` timestamps and exits with the command's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperScript {
    pub content: String,
}

/// Rendering context for the wrapper
#[derive(Serialize)]
struct WrapperContext<'a> {
    directives: &'a [String],
    source_env: bool,
    env_script: String,
    command: &'a str,
}

/// Backend specific knobs for the wrapper header
#[derive(Debug, Clone, Default)]
pub struct WrapperOptions {
    // extra lines right after the shebang, e.g. `#$` directives
    pub directives: Vec<String>,
    // grid nodes have no home directory to source a profile from
    pub skip_env: bool,
}

impl WrapperScript {
    pub fn render(
        job: &Job,
        config: &SubmitterConfig,
        options: &WrapperOptions,
    ) -> Result<Self, ScriptError> {
        let mut tt = TinyTemplate::new();
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        tt.add_template("wrapper", WRAPPER)?;

        let context = WrapperContext {
            directives: &options.directives,
            source_env: !options.skip_env && !config.env_script.is_empty(),
            env_script: env_source_path(&config.env_script),
            command: &job.command,
        };

        Ok(Self {
            content: tt.render("wrapper", &context)?,
        })
    }

    /// Write the wrapper and mark it executable
    pub fn write(&self, path: &Path) -> Result<(), ScriptError> {
        debug!(path = ?path, "Writing wrapper script");
        fs::write(path, &self.content)?;
        fs::set_permissions(path, Permissions::from_mode(0o775))?;

        Ok(())
    }
}

/// Relative profile names are looked up in the home directory of whoever runs the job
fn env_source_path(env_script: &str) -> String {
    if Path::new(env_script).is_absolute() {
        env_script.to_string()
    } else {
        format!("$HOME/{env_script}")
    }
}
