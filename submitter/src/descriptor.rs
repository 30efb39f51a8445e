//! Condor style submit descriptors, one per wrapper script

use itertools::Itertools;
use std::{fmt, fs, io, path::Path};
use tracing::debug;

/// Fixed requirements for glidein slots on the grid
const GRID_REQUIREMENTS: &str = r#"( Arch == "X86_64" ) &&               \
                 ( TARGET.OpSys == "LINUX" ) &&        \
                 ( OASIS_CVMFS_Exists =?= True ||      \
                       (IS_GLIDEIN && HasParrotCVMFS   \
                       && GLIDEIN_Site != "UNESP"      \
                       && GLIDEIN_Site != "UConn"      \
                       && GLIDEIN_Site != "Cornell"    \
                 ))"#;

/// Ordered `key = value` lines closed by a queue directive
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitDescriptor {
    lines: Vec<(String, String)>,
    queue: &'static str,
}

impl SubmitDescriptor {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            queue: "Queue",
        }
    }

    pub fn set(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.lines.push((key.to_string(), value.to_string()));
        self
    }

    pub fn set_opt(&mut self, key: &str, value: Option<impl fmt::Display>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// `request_memory`/`request_cpus`, only for what was asked for; zero asks for nothing
    pub fn resources(&mut self, memory: Option<f64>, ncpu: Option<u32>) -> &mut Self {
        self.set_opt(
            "request_memory",
            memory.filter(|memory| *memory > 0.0).map(format_memory),
        )
        .set_opt("request_cpus", ncpu.filter(|ncpu| *ncpu > 0))
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        debug!(path = ?path, "Writing submit descriptor");
        fs::write(path, self.to_string())
    }
}

impl Default for SubmitDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.lines.iter() {
            writeln!(f, "{key:<14} = {value}")?;
        }
        writeln!(f, "{}", self.queue)
    }
}

/// Memory requests are always in GB with two decimals
pub fn format_memory(memory: f64) -> String {
    format!("{memory:.2}G")
}

/// AND together a free-form expression and one exclusion per blacklisted host
pub fn compose_requirements(requirements: Option<&str>, blacklist: &[String]) -> Option<String> {
    let excluded = blacklist
        .iter()
        .map(|host| format!("(Machine != \"{host}\")"))
        .join(" && ");

    match (requirements, excluded.is_empty()) {
        (Some(requirements), false) => Some(format!("{requirements} && {excluded}")),
        (Some(requirements), true) => Some(requirements.to_string()),
        (None, false) => Some(excluded),
        (None, true) => None,
    }
}

/// Paths and resources for a job on a Condor pool with a shared filesystem
#[derive(Debug, Clone)]
pub struct CondorJob<'a> {
    pub executable: &'a Path,
    pub log_dir: &'a Path,
    pub node: &'a str,
    pub requirements: Option<&'a str>,
    pub blacklist: &'a [String],
    pub memory: Option<f64>,
    pub ncpu: Option<u32>,
    // stream output back instead of relying on the shared filesystem
    pub transfer_files: bool,
}

impl CondorJob<'_> {
    pub fn descriptor(&self) -> SubmitDescriptor {
        let log_dir = self.log_dir.display();
        let mut descriptor = SubmitDescriptor::new();

        descriptor
            .set("Universe", "vanilla")
            .set("Executable", self.executable.display())
            .set("Log", format!("{log_dir}/{}.log", self.node))
            .set("Output", format!("{log_dir}/{}.out", self.node))
            .set("Error", format!("{log_dir}/{}.err", self.node))
            .set("Notification", "NEVER");

        if self.transfer_files {
            descriptor
                .set("should_transfer_files", "YES")
                .set("stream_output", "True");
        }

        descriptor
            .set_opt(
                "Requirements",
                compose_requirements(self.requirements, self.blacklist),
            )
            .resources(self.memory, self.ncpu);

        descriptor
    }
}

/// A job staged to a grid submit host, all paths relative to the job directory there
#[derive(Debug, Clone)]
pub struct GridJob<'a> {
    pub script_name: &'a str,
    pub userid: u32,
    pub transfers: &'a [String],
    pub requirements: Option<&'a str>,
    pub memory: Option<f64>,
}

impl GridJob<'_> {
    pub fn descriptor(&self) -> SubmitDescriptor {
        let script = self.script_name;
        let proxy = format!("x509up_u{}", self.userid);
        let inputs = std::iter::once(format!("/tmp/{proxy}"))
            .chain(self.transfers.iter().cloned())
            .join(",");
        let requirements = match self.requirements {
            Some(extra) => format!("{GRID_REQUIREMENTS} && {extra}"),
            None => GRID_REQUIREMENTS.to_string(),
        };

        let mut descriptor = SubmitDescriptor::new();
        descriptor.queue = "queue";
        descriptor
            .set("Executable", script)
            .set("Log", format!("{script}.log"))
            .set("Output", format!("{script}.out"))
            .set("Error", format!("{script}.err"))
            .set("Environment", format!("\"X509_USER_PROXY={proxy}\""))
            .set("transfer_input_files", inputs)
            .set("+TransferOutput", "\"\"")
            .set("Universe", "vanilla")
            .set("Notification", "never")
            .set("+WantRHEL6", "True")
            .set("+WantGlideIn", "True")
            .set("Requirements", requirements)
            .resources(self.memory, None);

        descriptor
    }
}
