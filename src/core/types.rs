//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// An inventory host name.
pub type HostName = String;

/// An inventory group name.
pub type GroupName = String;

/// A role name, matching a directory in the roles source repository.
pub type RoleName = String;

/// A variable mapping as found in `host_vars/` and `group_vars/` files.
pub type Vars = serde_json::Map<String, serde_json::Value>;
