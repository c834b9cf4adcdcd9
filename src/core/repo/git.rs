//! Thin wrapper around the `git` binary.
//!
//! All version control access goes through [`Git`] so that failures are
//! normalized into [`RepoError`] and a missing binary is reported once.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::trace;

use crate::error::{Error, RepoError, Result};

/// Git invocation bound to one working directory.
pub(crate) struct Git<'a> {
    dir: &'a Path,
    identity: Option<(String, String)>,
}

impl<'a> Git<'a> {
    pub(crate) fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            identity: None,
        }
    }

    /// Use this author/committer when git has no configured identity.
    pub(crate) fn with_fallback_identity(mut self) -> Self {
        let configured = self
            .output(["config", "--get", "user.email"])
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !configured {
            let user = whoami::username();
            let host = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
            self.identity = Some((user.clone(), format!("{}@{}", user, host)));
        }
        self
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new("git");
        cmd.current_dir(self.dir);
        if let Some((name, email)) = &self.identity {
            cmd.arg("-c").arg(format!("user.name={}", name));
            cmd.arg("-c").arg(format!("user.email={}", email));
        }
        cmd.args(args);
        cmd.stdin(Stdio::inherit());
        cmd
    }

    /// Run and capture output without judging the exit status.
    pub(crate) fn output<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(args);
        trace!(dir = %self.dir.display(), cmd = ?cmd, "git");
        cmd.output().map_err(spawn_error)
    }

    /// Run, fail on non-zero exit, return stdout.
    pub(crate) fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let label = describe(&args);
        let output = self.output(args)?;
        check(&label, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run, fail on non-zero exit, return raw stdout.
    pub(crate) fn run_bytes<I, S>(&self, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let label = describe(&args);
        let output = self.output(args)?;
        check(&label, &output)?;
        Ok(output.stdout)
    }

    /// Run and report whether it exited successfully.
    pub(crate) fn succeeds<I, S>(&self, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Ok(self.output(args)?.status.success())
    }

    /// Run and split NUL-separated stdout into paths.
    pub(crate) fn paths<I, S>(&self, args: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let out = self.run(args)?;
        Ok(out
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn describe<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn check(label: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(RepoError::CommandFailed {
        command: label.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
    .into())
}

fn spawn_error(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::MissingBinary("git".to_string())
    } else {
        Error::Io(e)
    }
}

/// Map the stderr of a failed network operation onto the error taxonomy.
pub(crate) fn classify_remote_failure(url: &str, reference: &str, stderr: &str) -> Error {
    let lower = stderr.to_lowercase();
    if (lower.contains("remote branch") && lower.contains("not found"))
        || lower.contains("couldn't find remote ref")
        || lower.contains("did not match any")
        || lower.contains("pathspec")
    {
        return RepoError::ReferenceNotFound {
            url: url.to_string(),
            reference: reference.to_string(),
        }
        .into();
    }
    RepoError::RemoteUnavailable {
        url: url.to_string(),
        reason: stderr.trim().to_string(),
    }
    .into()
}

/// Map a failed `git checkout <reference>` onto a domain error.
///
/// Only an unknown revision is a missing reference; anything else (local
/// changes in the way, a held index lock) is reported with git's stderr.
pub(crate) fn classify_checkout_failure(url: &str, reference: &str, stderr: &str) -> Error {
    let lower = stderr.to_lowercase();
    if lower.contains("did not match any")
        || lower.contains("invalid reference")
        || lower.contains("unknown revision")
    {
        return RepoError::ReferenceNotFound {
            url: url.to_string(),
            reference: reference.to_string(),
        }
        .into();
    }
    RepoError::CommandFailed {
        command: format!("git checkout {}", reference),
        stderr: stderr.trim().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_branch() {
        let err = classify_remote_failure(
            "/srv/roles.git",
            "nope",
            "warning: Could not find remote branch nope to clone.\nfatal: Remote branch nope not found in upstream origin",
        );
        assert!(matches!(
            err,
            Error::Repo(RepoError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn test_classify_unreachable_remote() {
        let err = classify_remote_failure(
            "/nowhere",
            "main",
            "fatal: repository '/nowhere' does not exist",
        );
        assert!(matches!(err, Error::Repo(RepoError::RemoteUnavailable { .. })));
    }

    #[test]
    fn test_classify_checkout_unknown_reference() {
        let err = classify_checkout_failure(
            "/srv/deploy.git",
            "nope",
            "error: pathspec 'nope' did not match any file(s) known to git",
        );
        assert!(matches!(err, Error::Repo(RepoError::ReferenceNotFound { .. })));
    }

    #[test]
    fn test_classify_checkout_blocked_by_local_changes() {
        let stderr = "error: Your local changes to the following files would be overwritten by checkout:\n\tdata.enc\nAborting";
        match classify_checkout_failure("/srv/deploy.git", "other", stderr) {
            Error::Repo(RepoError::CommandFailed { command, stderr }) => {
                assert_eq!(command, "git checkout other");
                assert!(stderr.contains("would be overwritten"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_checkout_index_lock() {
        let err = classify_checkout_failure(
            "/srv/deploy.git",
            "main",
            "fatal: Unable to create '/srv/deploy/.git/index.lock': File exists.",
        );
        assert!(matches!(err, Error::Repo(RepoError::CommandFailed { .. })));
    }
}
