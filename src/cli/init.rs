//! Init and delete commands.

use crate::cli::{output, prompt, status};
use crate::core::workspace::Workspace;
use crate::error::Result;

/// Recreate the workspace from deployment.json.
pub fn init(ws: &mut Workspace, yes: bool) -> Result<()> {
    if !yes {
        status::show(ws, false)?;
    }
    prompt::confirm("(Re)initialize deployment?", "init", yes)?;

    ws.delete()?;
    ws.create()?;

    output::success(&format!("initialized {}", output::path(&ws.path().display().to_string())));
    output::kv("roles", ws.config().roles().join(", "));
    Ok(())
}

/// Delete the generated workspace files, optionally purging the writers.
pub fn delete(ws: &mut Workspace, purge_writers: bool, yes: bool) -> Result<()> {
    if !yes {
        status::show(ws, false)?;
    }
    prompt::confirm("Delete deployment?", "delete", yes)?;

    if purge_writers {
        for writer in ws.delete_from_writers()? {
            output::success(&format!("purged {}", writer));
        }
    }
    ws.delete()?;
    output::success("deployment deleted");
    output::dimmed("deployment.json, the deployment key and .ssh/ were kept");
    Ok(())
}
