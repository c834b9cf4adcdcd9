//! Bunker - sealed, versioned deployment workspaces.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init, lock, update, sync, run, status, inventory
//! │   ├── prompt        # Confirmations and update choices
//! │   └── output        # Styled terminal output
//! └── core/             # Core library components
//!     ├── config        # deployment.json
//!     ├── cipher/       # age encryption, deployment key, digests
//!     ├── repo/         # git wrapper, change tracking, blob registry
//!     ├── vault/        # lock/unlock, archive, shadow repository
//!     ├── inventory/    # model, merge, sources, writers, aggregation
//!     ├── secret_store/ # key/value secret store backends
//!     ├── role          # roles from the roles repository
//!     ├── playbook      # playbook.yml and ansible.cfg
//!     ├── runner        # ansible-playbook invocation
//!     ├── ssh           # deployment SSH keypair
//!     ├── view          # typed presentation
//!     └── workspace/    # orchestration of all of the above
//! ```
//!
//! # Features
//!
//! - Lock a workspace into one age-encrypted archive while keeping it
//!   pushable through a shadow repository
//! - Integrity digest checked before every unlock
//! - Inventory merged from local files, provisioning state and a secret store
//! - Roles cloned once and copied into the working tree on refresh

pub mod cli;
pub mod core;
pub mod error;
