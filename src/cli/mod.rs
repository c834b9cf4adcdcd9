//! Command-line interface.

pub mod init;
pub mod inventory;
pub mod lock;
pub mod output;
pub mod prompt;
pub mod run;
pub mod status;
pub mod sync;
pub mod update;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::PluginKind;
use crate::core::workspace::{Scope, Workspace};
use crate::error::{ConfigError, Error, RepoError, Result, SecretStoreError, VaultError};

/// Bunker - sealed, versioned deployment workspaces.
#[derive(Parser)]
#[command(
    name = "bunker",
    about = "Sealed, versioned deployment workspaces",
    version
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory
    #[arg(short = 'C', long, global = true, env = "BUNKER_DIR", default_value = ".")]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// (Re)initialize the workspace from deployment.json
    Init {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show workspace information
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show lock state and pending changes
    Status,

    /// Regenerate workspace files and commit the chosen changes
    Update {
        /// all, roles, playbook, inventory, group_vars or runner_config
        #[arg(default_value = "all")]
        scope: Scope,
        /// Apply every change without asking
        #[arg(long)]
        non_interactive: bool,
    },

    /// Encrypt the workspace
    Lock {
        #[arg(short, long)]
        yes: bool,
    },

    /// Decrypt the workspace
    Unlock {
        /// Unlock even if the archive digest does not match
        #[arg(long)]
        force: bool,
        #[arg(short, long)]
        yes: bool,
    },

    /// Push the locked workspace to the deployment remote
    Push,

    /// Pull the locked workspace from the deployment remote
    Pull,

    /// Run the playbook with ansible-playbook
    Run {
        /// Only run these roles
        roles: Vec<String>,
        /// Limit the run to matching hosts
        #[arg(short, long)]
        limit: Option<String>,
        /// Extra variables as key=value
        #[arg(short, long = "extra-var")]
        extra_vars: Vec<String>,
        #[arg(long)]
        disable_host_key_checking: bool,
    },

    /// Run the configured inventory writers
    Persist {
        /// Persist without deployment key and ssh keypair
        #[arg(long)]
        template_mode: bool,
    },

    /// Aggregate and print the inventory
    Inventory {
        /// Read only these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<PluginKind>,
        /// Print connection details of one host
        #[arg(long)]
        host: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the deployment key with the one held by an inventory source
    FetchKey {
        source: PluginKind,
    },

    /// Delete all generated workspace files
    Delete {
        /// Also purge what the inventory writers hold
        #[arg(long)]
        purge_writers: bool,
        #[arg(short, long)]
        yes: bool,
    },
}

/// Execute a command. Returns the process exit code.
pub fn execute(cli: Cli) -> Result<i32> {
    use Command::*;

    let mut workspace = Workspace::load(&cli.dir)?;
    if workspace.new_key_generated() {
        output::alert(&format!(
            "Deployment key written to: {}",
            workspace.vault().key_path().display()
        ));
    }

    let ws = &mut workspace;
    match cli.command {
        Init { yes } => init::init(ws, yes)?,
        Show { json } => status::show(ws, json)?,
        Status => status::status(ws)?,
        Update {
            scope,
            non_interactive,
        } => update::execute(ws, scope, non_interactive)?,
        Lock { yes } => lock::lock(ws, yes)?,
        Unlock { force, yes } => lock::unlock(ws, force, yes)?,
        Push => sync::push(ws)?,
        Pull => sync::pull(ws)?,
        Run {
            roles,
            limit,
            extra_vars,
            disable_host_key_checking,
        } => {
            return run::execute(ws, roles, limit, extra_vars, disable_host_key_checking);
        }
        Persist { template_mode } => inventory::persist(ws, template_mode)?,
        Inventory {
            sources,
            host,
            json,
        } => inventory::show(ws, &sources, host.as_deref(), json)?,
        FetchKey { source } => inventory::fetch_key(ws, source)?,
        Delete { purge_writers, yes } => init::delete(ws, purge_writers, yes)?,
    }
    Ok(0)
}

/// Next step to suggest for an error, if there is an obvious one.
pub fn hint_for(error: &Error) -> Option<&'static str> {
    match error {
        Error::Config(ConfigError::NotFound(_)) => {
            Some("create deployment.json in the workspace directory")
        }
        Error::Config(ConfigError::NotInitialized(_)) => Some("run: bunker init"),
        Error::Vault(VaultError::RequiresUnlock(_)) => Some("run: bunker unlock"),
        Error::Vault(VaultError::RequiresLock(_)) => Some("run: bunker lock"),
        Error::Vault(VaultError::IntegrityVerificationFailed { .. }) => {
            Some("run: bunker unlock --force to unlock anyway")
        }
        Error::Vault(VaultError::MissingKey(_)) => Some("run: bunker fetch-key <source>"),
        Error::Repo(RepoError::DirtyWorkingTree { .. }) => {
            Some("commit or discard the changes first")
        }
        Error::SecretStore(SecretStoreError::Unavailable(_)) => {
            Some("check VAULT_ADDR and VAULT_TOKEN")
        }
        Error::ConfirmationRequired("update") => Some("pass --non-interactive to apply every change"),
        Error::ConfirmationRequired(_) => Some("pass --yes to skip the confirmation"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_scope() {
        let cli = Cli::try_parse_from(["bunker", "update", "group_vars", "--non-interactive"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Update {
                scope: Scope::GroupVars,
                non_interactive: true
            }
        ));
    }

    #[test]
    fn test_parse_inventory_sources() {
        let cli =
            Cli::try_parse_from(["bunker", "inventory", "--source", "terraform", "--source", "local"])
                .unwrap();
        let Command::Inventory { sources, .. } = cli.command else {
            panic!("expected inventory command");
        };
        assert_eq!(sources, [PluginKind::ProvisioningState, PluginKind::Local]);
    }

    #[test]
    fn test_rejects_unknown_plugin() {
        assert!(Cli::try_parse_from(["bunker", "fetch-key", "ldap"]).is_err());
    }

    #[test]
    fn test_hints() {
        assert_eq!(
            hint_for(&VaultError::RequiresUnlock("run").into()),
            Some("run: bunker unlock")
        );
        assert_eq!(hint_for(&VaultError::AlreadyLocked.into()), None);
        assert_eq!(
            hint_for(&Error::ConfirmationRequired("lock")),
            Some("pass --yes to skip the confirmation")
        );
    }
}
