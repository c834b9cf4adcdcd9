//! Core library components.
//!
//! Everything a workspace needs lives here; the `cli` module only parses
//! arguments, prompts and prints.

pub mod cipher;
pub mod config;
pub mod constants;
pub mod inventory;
pub mod playbook;
pub mod repo;
pub mod role;
pub mod runner;
pub mod secret_store;
pub mod ssh;
pub mod types;
pub mod vault;
pub mod view;
pub mod workspace;
