use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::core::constants;
use crate::error::{Error, Result};

/// Arguments for one playbook run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Restrict the run to these role tags.
    pub tags: Vec<String>,
    /// Host pattern passed to `-l`.
    pub limit: Option<String>,
    /// `key=value` pairs, one `-e` each.
    pub extra_vars: Vec<String>,
    pub disable_host_key_checking: bool,
}

impl RunOptions {
    /// Arguments after the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![constants::PLAYBOOK_FILE.to_string()];
        if !self.tags.is_empty() {
            args.push("--tags".to_string());
            args.push(self.tags.join(","));
        }
        if let Some(limit) = &self.limit {
            args.push("-l".to_string());
            args.push(limit.clone());
        }
        for var in &self.extra_vars {
            args.push("-e".to_string());
            args.push(var.clone());
        }
        args
    }

    /// The command line as recorded in the run commit.
    pub fn command_line(&self) -> String {
        let mut line = constants::RUNNER_PROGRAM.to_string();
        for arg in self.args() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}

/// Run the playbook in `dir` with inherited stdio and return its exit code.
pub fn run_playbook(dir: &Path, options: &RunOptions) -> Result<i32> {
    let program = which::which(constants::RUNNER_PROGRAM)
        .map_err(|_| Error::MissingBinary(constants::RUNNER_PROGRAM.to_string()))?;

    let mut command = Command::new(program);
    command.current_dir(dir).args(options.args());
    if options.disable_host_key_checking {
        command.env("ANSIBLE_HOST_KEY_CHECKING", "False");
    }
    debug!(command = %options.command_line(), "running playbook");

    let status = command.status()?;
    let code = status.code().unwrap_or(1);
    info!(code, "playbook finished");
    Ok(code)
}
