//! Run command.

use crate::core::runner::RunOptions;
use crate::core::workspace::Workspace;
use crate::error::Result;

/// Run the playbook; the exit code becomes the process exit code.
pub fn execute(
    ws: &mut Workspace,
    roles: Vec<String>,
    limit: Option<String>,
    extra_vars: Vec<String>,
    disable_host_key_checking: bool,
) -> Result<i32> {
    ws.check_environment()?;
    let options = RunOptions {
        tags: roles,
        limit,
        extra_vars,
        disable_host_key_checking,
    };
    ws.run(&options)
}
