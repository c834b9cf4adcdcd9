//! Interactive confirmation.

use std::io::{self, IsTerminal};

use dialoguer::{Confirm, Select};

use crate::error::{Error, Result};

/// Ask before a destructive operation.
///
/// `--yes` skips the prompt. Without a terminal and without `--yes` the
/// operation fails instead of guessing.
pub fn confirm(prompt: &str, operation: &'static str, yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }
    if !io::stdin().is_terminal() {
        return Err(Error::ConfirmationRequired(operation));
    }
    if Confirm::new().with_prompt(prompt).default(false).interact()? {
        Ok(())
    } else {
        Err(Error::Cancelled)
    }
}

/// What to do with one changed file during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateChoice {
    Apply,
    Discard,
    Keep,
}

pub fn update_choice(file: &str) -> Result<UpdateChoice> {
    let choice = Select::new()
        .with_prompt(format!("{}: apply, discard or keep unstaged?", file))
        .items(&["apply", "discard", "keep unstaged"])
        .default(2)
        .interact()?;
    Ok(match choice {
        0 => UpdateChoice::Apply,
        1 => UpdateChoice::Discard,
        _ => UpdateChoice::Keep,
    })
}
