//! Deep merge with later-wins precedence.

use serde_json::Value;

use super::InventoryModel;
use crate::core::types::Vars;

/// Merge `overlay` into `base`.
///
/// Mappings merge key by key, recursively. Anything else, lists included,
/// is replaced by the overlay value.
pub fn merge_value(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_vars(base, overlay),
        (base, overlay) => *base = overlay,
    }
}

pub fn merge_vars(base: &mut Vars, overlay: Vars) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

impl InventoryModel {
    /// Merge a higher-precedence model into this one.
    ///
    /// Hosts and group memberships are unioned, never removed. Variable
    /// sets merge deeply; an empty variable set from `other` does not create
    /// a new entry.
    pub fn merge(&mut self, other: InventoryModel) {
        for (host, vars) in other.hosts {
            merge_vars(self.hosts.entry(host).or_default(), vars);
        }
        for (name, group) in other.groups {
            let target = self.groups.entry(name).or_default();
            target.hosts.extend(group.hosts);
            merge_vars(&mut target.vars, group.vars);
        }
        for (host, vars) in other.host_vars {
            merge_entry(&mut self.host_vars, host, vars);
        }
        for (group, vars) in other.group_vars {
            merge_entry(&mut self.group_vars, group, vars);
        }
    }
}

fn merge_entry(map: &mut std::collections::BTreeMap<String, Vars>, name: String, vars: Vars) {
    match map.get_mut(&name) {
        Some(existing) => merge_vars(existing, vars),
        None if !vars.is_empty() => {
            map.insert(name, vars);
        }
        None => {}
    }
}
