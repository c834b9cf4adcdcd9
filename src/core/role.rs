//! Automation roles.
//!
//! A role is a directory from the roles repository with the conventional
//! subdirectories. Roles are read-only here: their `defaults` feed the
//! workspace's group variables and the role tree is copied into `roles/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::inventory::{merge_vars, read_yaml};
use crate::core::types::{RoleName, Vars};
use crate::error::Result;

/// Subdirectories a role may have.
pub const ROLE_SUBDIRECTORIES: &[&str] = &[
    "defaults",
    "vars",
    "tasks",
    "files",
    "handlers",
    "templates",
    "meta",
];

/// One file inside a role subdirectory.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleFile {
    pub path: PathBuf,
    /// Parsed content for YAML files.
    pub data: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct Role {
    name: RoleName,
    path: PathBuf,
    /// Files per subdirectory, keyed by path relative to the subdirectory.
    /// Absent subdirectories have no entry.
    subdirectories: BTreeMap<&'static str, BTreeMap<String, RoleFile>>,
}

impl Role {
    /// Parse the role at `path`; its name is the directory name.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut subdirectories = BTreeMap::new();
        for sub in ROLE_SUBDIRECTORIES {
            let dir = path.join(sub);
            if dir.is_dir() {
                subdirectories.insert(*sub, parse_subdirectory(&dir)?);
            }
        }
        debug!(role = %name, subdirectories = subdirectories.len(), "role parsed");
        Ok(Self {
            name,
            path,
            subdirectories,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files of one subdirectory, `None` if the role lacks it.
    pub fn subdirectory(&self, name: &str) -> Option<&BTreeMap<String, RoleFile>> {
        self.subdirectories.get(name)
    }

    pub fn defaults(&self) -> Option<&BTreeMap<String, RoleFile>> {
        self.subdirectory("defaults")
    }

    pub fn tasks(&self) -> Option<&BTreeMap<String, RoleFile>> {
        self.subdirectory("tasks")
    }

    /// All `defaults` mappings merged in file order.
    pub fn default_vars(&self) -> Vars {
        let mut vars = Vars::new();
        for file in self.defaults().into_iter().flat_map(BTreeMap::values) {
            if let Some(Value::Object(map)) = &file.data {
                merge_vars(&mut vars, map.clone());
            }
        }
        vars
    }

    /// Replace `dest/<name>` with a copy of the role.
    pub fn copy_to(&self, dest: &Path) -> Result<PathBuf> {
        let target = dest.join(&self.name);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let rel = entry.path().strip_prefix(&self.path).unwrap_or(entry.path());
            let out = target.join(rel);
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                copy_link(entry.path(), &out)?;
            } else if file_type.is_dir() {
                fs::create_dir_all(&out)?;
            } else {
                fs::copy(entry.path(), &out)?;
            }
        }
        trace!(role = %self.name, target = %target.display(), "role copied");
        Ok(target)
    }
}

/// Recreate a symlink as-is; the link target is not followed.
#[cfg(unix)]
fn copy_link(src: &Path, out: &Path) -> Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(&target, out)?;
    trace!(link = %out.display(), target = %target.display(), "symlink recreated");
    Ok(())
}

/// Without portable symlinks a link to a file is copied and anything else skipped.
#[cfg(not(unix))]
fn copy_link(src: &Path, out: &Path) -> Result<()> {
    if fs::metadata(src).map(|m| m.is_file()).unwrap_or(false) {
        fs::copy(src, out)?;
    } else {
        debug!(link = %src.display(), "skipping directory symlink");
    }
    Ok(())
}

fn parse_subdirectory(dir: &Path) -> Result<BTreeMap<String, RoleFile>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_path_buf();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        let data = if is_yaml { Some(read_yaml(&path)?) } else { None };
        let rel = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        files.insert(rel, RoleFile { path, data });
    }
    Ok(files)
}
