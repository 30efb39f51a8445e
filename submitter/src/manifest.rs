//! DAGMan manifests used as a multi-job submission envelope

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// One `JOB` line per job, all siblings, no dependency edges
///
/// `config_ref` is what the `CONFIG` line points at. It is the absolute config path for
/// manifests submitted where they are written, and just its file name for manifests that get
/// staged elsewhere first.
#[derive(Debug, Clone, PartialEq)]
pub struct DagManifest {
    path: PathBuf,
    config_path: PathBuf,
    config_ref: String,
    max_per_interval: Option<u32>,
    entries: Vec<(String, String)>,
}

impl DagManifest {
    /// `<dir>/<prefix>_submit.dag` with its `.config` sibling
    pub fn new(dir: &Path, prefix: &str, max_per_interval: Option<u32>) -> Self {
        let path = dir.join(format!("{prefix}_submit.dag"));
        let config_path = dir.join(format!("{prefix}_submit.dag.config"));

        Self {
            config_ref: config_path.display().to_string(),
            path,
            config_path,
            max_per_interval,
            entries: Vec::new(),
        }
    }

    /// Refer to the config by file name only
    pub fn relative(mut self) -> Self {
        self.config_ref = file_name(&self.config_path);
        self
    }

    pub fn push(&mut self, node: impl Into<String>, descriptor: impl Into<String>) {
        self.entries.push((node.into(), descriptor.into()));
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Throttle on submissions per DAGMan cycle, distinct from `-maxjobs`
    pub fn throttle(&self) -> String {
        match self.max_per_interval {
            Some(max) => format!("DAGMAN_MAX_SUBMITS_PER_INTERVAL = {max}\n"),
            None => String::new(),
        }
    }

    /// Write both the manifest and its config file
    pub fn write(&self) -> io::Result<()> {
        debug!(path = ?self.config_path, "Writing manifest config");
        fs::write(&self.config_path, self.throttle())?;
        fs::write(&self.path, self.to_string())?;
        info!(path = ?self.path, jobs = self.entries.len(), "Wrote manifest");

        Ok(())
    }
}

impl fmt::Display for DagManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CONFIG {}", self.config_ref)?;
        for (node, descriptor) in self.entries.iter() {
            writeln!(f, "JOB {node} {descriptor}")?;
        }

        Ok(())
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// DAG node name for a label, also used as the wrapper's file name
///
/// DAGMan node names must not contain `.`, `+` or `-`, the `.sh` suffix included. Underscores
/// in the label are doubled first, so distinct labels always get distinct nodes.
pub fn dag_node(prefix: &str, label: &str) -> String {
    let label = label
        .replace('_', "__")
        .replace('.', "_dot_")
        .replace('+', "_plus_")
        .replace('-', "_minus_");

    format!("{prefix}_{label}_dot_sh")
}
