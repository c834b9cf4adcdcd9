//! Lock and unlock commands.

use crate::cli::{output, prompt};
use crate::core::workspace::Workspace;
use crate::error::{Result, VaultError};

pub fn lock(ws: &mut Workspace, yes: bool) -> Result<()> {
    if ws.is_locked() {
        return Err(VaultError::AlreadyLocked.into());
    }
    ws.check_environment()?;
    let key = ws.vault().key_path();
    prompt::confirm(
        &format!("Encrypt deployment with {}?", key.display()),
        "lock",
        yes,
    )?;

    ws.lock()?;
    output::success("locked");
    output::kv("archive", output::path(&ws.vault().encrypted_archive_path().display().to_string()));
    output::hint("safe to push: bunker push");
    Ok(())
}

pub fn unlock(ws: &mut Workspace, force: bool, yes: bool) -> Result<()> {
    if !ws.is_locked() {
        return Err(VaultError::AlreadyUnlocked.into());
    }
    let key = ws.vault().key_path();
    prompt::confirm(
        &format!("Decrypt deployment with {}?", key.display()),
        "unlock",
        yes,
    )?;

    if force && !ws.vault().verify()? {
        output::warn("archive digest mismatch, unlocking anyway");
    }
    ws.unlock(force)?;
    output::success("unlocked");
    Ok(())
}
