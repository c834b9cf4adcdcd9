//! Canonical inventory representation.
//!
//! The on-disk form is the Ansible layout: a `hosts.yml` document
//!
//! ```yaml
//! all:
//!   hosts:
//!     web1:
//!   children:
//!     bunker:
//!       hosts:
//!         web1:
//! ```
//!
//! plus one YAML file per host in `host_vars/` and per group in
//! `group_vars/`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::core::constants;
use crate::core::types::{GroupName, HostName, Vars};
use crate::error::{InventoryError, Result};

/// Editor leftovers skipped when reading variable directories.
const IGNORED_SUFFIXES: &[&str] = &[".swp", "~"];
const VARS_EXTENSIONS: &[&str] = &[".yml", ".yaml", ".json"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub hosts: BTreeSet<HostName>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub vars: Vars,
}

/// Hosts, groups and their variables.
///
/// Every host named in a group is also present in `hosts`; [`normalize`]
/// restores that after manual edits.
///
/// [`normalize`]: InventoryModel::normalize
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryModel {
    /// Hosts with their inline variables.
    pub hosts: BTreeMap<HostName, Vars>,
    pub groups: BTreeMap<GroupName, Group>,
    pub host_vars: BTreeMap<HostName, Vars>,
    pub group_vars: BTreeMap<GroupName, Vars>,
}

impl InventoryModel {
    /// Empty inventory with the deployment group and one group per role.
    pub fn skeleton<S: AsRef<str>>(roles: &[S]) -> Self {
        let mut model = Self::default();
        model.groups.entry(constants::DEPLOYMENT_GROUP.to_string()).or_default();
        for role in roles {
            model.groups.entry(role.as_ref().to_string()).or_default();
        }
        model
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
            && self.groups.is_empty()
            && self.host_vars.is_empty()
            && self.group_vars.is_empty()
    }

    /// Add a host, optionally as a member of `group`.
    pub fn add_host(&mut self, host: &str, group: Option<&str>) {
        self.hosts.entry(host.to_string()).or_default();
        if let Some(group) = group {
            self.groups
                .entry(group.to_string())
                .or_default()
                .hosts
                .insert(host.to_string());
        }
    }

    /// Make every grouped host a known host.
    pub fn normalize(&mut self) {
        let grouped: Vec<HostName> = self
            .groups
            .values()
            .flat_map(|g| g.hosts.iter().cloned())
            .collect();
        for host in grouped {
            self.hosts.entry(host).or_default();
        }
    }

    /// Effective variable lookup for one host: group vars of `all`, then of
    /// its groups, then inline vars, then host vars.
    pub fn host_facts(&self, host: &str) -> Option<Vars> {
        if !self.hosts.contains_key(host) && !self.host_vars.contains_key(host) {
            return None;
        }
        let mut facts = Vars::new();
        let mut layer = |vars: Option<&Vars>| {
            if let Some(vars) = vars {
                super::merge::merge_vars(&mut facts, vars.clone());
            }
        };
        layer(self.group_vars.get("all"));
        for (name, group) in &self.groups {
            if group.hosts.contains(host) {
                layer(Some(&group.vars));
                layer(self.group_vars.get(name));
            }
        }
        layer(self.hosts.get(host));
        layer(self.host_vars.get(host));
        Some(facts)
    }

    /// The `hosts.yml` document.
    pub fn hosts_document(&self) -> Value {
        let hosts: Map<String, Value> = self
            .hosts
            .iter()
            .map(|(name, vars)| (name.clone(), inline(vars)))
            .collect();

        let children: Map<String, Value> = self
            .groups
            .iter()
            .map(|(name, group)| {
                let members: Map<String, Value> = group
                    .hosts
                    .iter()
                    .map(|h| (h.clone(), Value::Null))
                    .collect();
                let mut entry = Map::new();
                entry.insert("hosts".to_string(), Value::Object(members));
                if !group.vars.is_empty() {
                    entry.insert("vars".to_string(), Value::Object(group.vars.clone()));
                }
                (name.clone(), Value::Object(entry))
            })
            .collect();

        let mut all = Map::new();
        all.insert("hosts".to_string(), Value::Object(hosts));
        all.insert("children".to_string(), Value::Object(children));
        let mut doc = Map::new();
        doc.insert("all".to_string(), Value::Object(all));
        Value::Object(doc)
    }

    /// Parse a `hosts.yml` document. Unknown keys are ignored.
    pub fn from_hosts_document(doc: &Value) -> Self {
        let mut model = Self::default();
        let Some(all) = doc.get("all") else {
            return model;
        };

        if let Some(Value::Object(hosts)) = all.get("hosts") {
            for (name, vars) in hosts {
                model.hosts.insert(name.clone(), as_vars(vars));
            }
        }
        if let Some(Value::Object(children)) = all.get("children") {
            for (name, entry) in children {
                let group = model.groups.entry(name.clone()).or_default();
                if let Some(Value::Object(members)) = entry.get("hosts") {
                    group.hosts.extend(members.keys().cloned());
                }
                if let Some(vars) = entry.get("vars") {
                    group.vars = as_vars(vars);
                }
            }
        }
        model.normalize();
        model
    }

    /// Read `hosts.yml`, `host_vars/` and `group_vars/` below `root`.
    ///
    /// Missing files yield an empty model.
    pub fn load(root: &Path) -> Result<Self> {
        let hosts_file = root.join(constants::HOSTS_FILE);
        let mut model = if hosts_file.exists() {
            Self::from_hosts_document(&read_yaml(&hosts_file)?)
        } else {
            Self::default()
        };
        model.host_vars = read_vars_dir(&root.join(constants::HOST_VARS_DIR))?;
        model.group_vars = read_vars_dir(&root.join(constants::GROUP_VARS_DIR))?;
        debug!(
            hosts = model.hosts.len(),
            groups = model.groups.len(),
            "local inventory loaded"
        );
        Ok(model)
    }

    /// Write the model below `root`; returns the written paths relative to it.
    pub fn write(&self, root: &Path) -> Result<Vec<String>> {
        let mut written = Vec::new();

        for (dir, vars) in [
            (constants::HOST_VARS_DIR, &self.host_vars),
            (constants::GROUP_VARS_DIR, &self.group_vars),
        ] {
            fs::create_dir_all(root.join(dir))?;
            for (name, vars) in vars {
                let rel = format!("{}/{}", dir, name);
                write_yaml(&root.join(&rel), &Value::Object(vars.clone()))?;
                written.push(rel);
            }
        }

        write_yaml(&root.join(constants::HOSTS_FILE), &self.hosts_document())?;
        written.push(constants::HOSTS_FILE.to_string());
        debug!(files = written.len(), "inventory written");
        Ok(written)
    }
}

fn inline(vars: &Vars) -> Value {
    if vars.is_empty() {
        Value::Null
    } else {
        Value::Object(vars.clone())
    }
}

fn as_vars(value: &Value) -> Vars {
    match value {
        Value::Object(map) => map.clone(),
        _ => Vars::new(),
    }
}

pub(crate) fn read_yaml(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml_ng::from_str(&contents).map_err(|e| {
        InventoryError::InvalidFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn write_yaml(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml_ng::to_string(value)?)?;
    trace!(path = %path.display(), "yaml written");
    Ok(())
}

/// Entry name for a vars file: the file name minus a known data extension.
///
/// Host names may contain dots, so only `.yml`, `.yaml` and `.json` are cut.
fn vars_entry_name(file_name: &str) -> &str {
    VARS_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name)
}

/// One file per entry, named by [`vars_entry_name`].
fn read_vars_dir(dir: &Path) -> Result<BTreeMap<String, Vars>> {
    let mut vars = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(vars);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    for file in files {
        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }
        vars.insert(vars_entry_name(name).to_string(), as_vars(&read_yaml(&file)?));
    }
    Ok(vars)
}
