//! Inventory, persist and fetch-key commands.

use crate::cli::output;
use crate::core::config::PluginKind;
use crate::core::workspace::Workspace;
use crate::error::Result;

/// Aggregate the inventory and print it, or one host's connection details.
pub fn show(ws: &mut Workspace, sources: &[PluginKind], host: Option<&str>, json: bool) -> Result<()> {
    let aggregate = ws.update_inventory(sources)?;
    for source in &aggregate.degraded {
        output::warn(&format!("{} unavailable, using its fallback", source));
    }

    if let Some(host) = host {
        let details = ws.connection_details(host)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&details)?);
        } else {
            output::section(host);
            output::kv("host", details.ansible_host.as_deref().unwrap_or("-"));
            output::kv("user", details.ansible_user.as_deref().unwrap_or("-"));
            output::kv("port", details.ansible_port.as_deref().unwrap_or("22"));
        }
        return Ok(());
    }

    let model = &ws.inventory()?.model;
    if json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }
    output::section("Groups");
    for (name, group) in &model.groups {
        output::kv(name, group.hosts.iter().cloned().collect::<Vec<_>>().join(", "));
    }
    output::section("Hosts");
    for name in model.hosts.keys() {
        output::list_item(name);
    }
    Ok(())
}

pub fn persist(ws: &mut Workspace, template_mode: bool) -> Result<()> {
    ws.check_environment()?;
    let writers = ws.persist(template_mode)?;
    output::success(&format!("persisted to {}", writers.join(", ")));
    if template_mode {
        output::dimmed("deployment key and ssh keypair were not written");
    }
    Ok(())
}

pub fn fetch_key(ws: &mut Workspace, source: PluginKind) -> Result<()> {
    ws.fetch_key(source)?;
    output::success(&format!("deployment key fetched from {}", source));
    output::kv("key", output::path(&ws.vault().key_path().display().to_string()));
    Ok(())
}
