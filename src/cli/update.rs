//! Update command.
//!
//! Regenerates the chosen scope, then shows each changed file's diff and
//! asks whether to apply, discard or keep it. New files are always committed.

use std::io::{self, IsTerminal};

use crate::cli::output;
use crate::cli::prompt::{self, UpdateChoice};
use crate::core::workspace::{Scope, Workspace};
use crate::error::{Error, Result};

pub fn execute(ws: &mut Workspace, scope: Scope, non_interactive: bool) -> Result<()> {
    ws.check_environment()?;
    if !non_interactive && !io::stdin().is_terminal() {
        return Err(Error::ConfirmationRequired("update"));
    }

    let report = ws.update(scope)?;

    let files = if non_interactive {
        report.changes.all.clone()
    } else {
        let mut apply = Vec::new();
        for file in &report.changes.all {
            output::section(file);
            output::diff(&ws.deployment_repo().diff(file)?);
            match prompt::update_choice(file)? {
                UpdateChoice::Apply => apply.push(file.clone()),
                UpdateChoice::Discard => ws.deployment_repo().discard(file)?,
                UpdateChoice::Keep => {}
            }
        }
        apply
    };

    if !report.changes.new.is_empty() {
        output::header("new files");
        for file in &report.changes.new {
            output::list_item(file);
        }
    }
    if report.roles_updated() {
        output::success("updated roles repository");
        output::kv("old HEAD", report.old_roles_head.as_deref().unwrap_or("-"));
        output::kv("new HEAD", report.new_roles_head.as_deref().unwrap_or("-"));
    }

    if ws.commit_update(&report, &files)? {
        output::success(&format!("committed update ({})", scope));
    } else {
        output::dimmed("nothing to commit");
    }
    Ok(())
}
