//! Show and status commands.

use crate::cli::output;
use crate::core::view::WorkspaceView;
use crate::core::workspace::Workspace;
use crate::error::Result;

/// Print the workspace view.
pub fn show(ws: &Workspace, json: bool) -> Result<()> {
    let view = ws.view()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    output::section(&format!("Deployment {}", view.name));
    output::kv("path", output::path(&view.path.display().to_string()));
    output::kv("roles", view.roles.join(", "));
    output::kv("roles repo", &view.roles_repo);
    if let Some(repo) = &view.deployment_repo {
        output::kv("deployment repo", repo);
    }
    output::kv("locked", if view.locked { "yes" } else { "no" });
    output::kv("key", output::path(&view.key_file.display().to_string()));
    print_hosts(&view);
    Ok(())
}

fn print_hosts(view: &WorkspaceView) {
    if view.hosts.is_empty() {
        return;
    }
    output::section("Hosts");
    for host in &view.hosts {
        let address = host.ansible_host.as_deref().unwrap_or("-");
        let user = host.ansible_user.as_deref().unwrap_or("-");
        match &host.ansible_port {
            Some(port) => output::list_item(&format!("{}  {}@{}:{}", host.name, user, address, port)),
            None => output::list_item(&format!("{}  {}@{}", host.name, user, address)),
        }
    }
}

/// Lock state, archive integrity and pending changes.
pub fn status(ws: &Workspace) -> Result<()> {
    let view = ws.view()?;
    output::section(&format!("{} status", view.name));

    if view.locked {
        output::kv("state", "locked");
        let intact = ws.vault().verify()?;
        output::kv("archive", if intact { "digest ok" } else { "digest mismatch" });
        if !intact {
            output::warn("encrypted archive does not match its digest");
        }
        output::hint("run: bunker unlock");
        return Ok(());
    }

    output::kv("state", "unlocked");
    output::kv("hosts", view.hosts.len());
    let Some(changes) = view.changes else {
        output::hint("run: bunker init");
        return Ok(());
    };
    if changes.is_clean() {
        output::success("nothing pending");
        return Ok(());
    }
    for (label, files) in [
        ("new", &changes.new),
        ("staged", &changes.staged),
        ("unstaged", &changes.unstaged),
    ] {
        if files.is_empty() {
            continue;
        }
        output::header(label);
        for file in files {
            output::list_item(file);
        }
    }
    Ok(())
}
