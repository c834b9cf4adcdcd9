//! Push and pull of a locked workspace.

use tracing::info;

use crate::cli::output;
use crate::core::workspace::Workspace;
use crate::error::Result;

pub fn push(ws: &mut Workspace) -> Result<()> {
    info!("pushing locked workspace");
    ws.push()?;
    output::success("pushed");
    Ok(())
}

pub fn pull(ws: &mut Workspace) -> Result<()> {
    info!("pulling locked workspace");
    let restored = ws.pull()?;
    output::success("pulled");
    for blob in restored {
        output::list_item(&format!("restored {}", blob));
    }
    Ok(())
}
