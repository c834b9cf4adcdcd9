//! Change classification.
//!
//! A [`ChangeSet`] is a snapshot of the working tree versus the index versus
//! HEAD, computed fresh on every request.

use serde::Serialize;

/// Files that differ between working tree, index and HEAD.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Untracked files that belong to the repository's declared content.
    pub new: Vec<String>,
    /// Index differs from HEAD.
    pub staged: Vec<String>,
    /// Working tree differs from index.
    pub unstaged: Vec<String>,
    /// `staged` followed by `unstaged`, without duplicates.
    pub all: Vec<String>,
}

impl ChangeSet {
    pub(crate) fn new(new: Vec<String>, staged: Vec<String>, unstaged: Vec<String>) -> Self {
        let mut all = staged.clone();
        for path in &unstaged {
            if !all.contains(path) {
                all.push(path.clone());
            }
        }
        Self {
            new,
            staged,
            unstaged,
            all,
        }
    }

    /// Nothing new, staged or unstaged.
    pub fn is_clean(&self) -> bool {
        self.new.is_empty() && self.all.is_empty()
    }

    pub fn is_staged(&self, path: &str) -> bool {
        self.staged.iter().any(|p| p == path)
    }

    pub fn is_unstaged(&self, path: &str) -> bool {
        self.unstaged.iter().any(|p| p == path)
    }
}

/// Whether an untracked path counts as new content.
///
/// A path qualifies when it falls under one of `patterns` (directory
/// prefixes such as `host_vars/`) or equals or lives beneath one of the
/// declared `content` paths.
pub(crate) fn is_declared_content(path: &str, patterns: &[String], content: &[String]) -> bool {
    if patterns.iter().any(|p| path.starts_with(p.as_str())) {
        return true;
    }
    content.iter().any(|c| {
        let c = c.trim_end_matches('/');
        path == c || path.strip_prefix(c).is_some_and(|rest| rest.starts_with('/'))
    })
}
