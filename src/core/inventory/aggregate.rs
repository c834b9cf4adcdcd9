//! Inventory aggregation.
//!
//! Sources are read in order and deep-merged, later sources taking
//! precedence. The local source is always read first, so a workspace whose
//! external sources are gone still resolves to its last written state.

use tracing::{debug, info, warn};

use super::source::{InventorySource, PluginContext, SourceOutput};
use super::InventoryModel;
use crate::core::cipher::DeploymentKey;
use crate::core::config::PluginKind;
use crate::core::ssh::SshKeypair;
use crate::error::Result;

/// Merged result of all sources.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub model: InventoryModel,
    /// First key found, in source order.
    pub deployment_key: Option<DeploymentKey>,
    /// Each half taken from the first source that has it.
    pub ssh_keypair: SshKeypair,
    pub added_files: Vec<String>,
    /// Sources that fell back instead of producing.
    pub degraded: Vec<&'static str>,
}

impl Aggregate {
    fn absorb(&mut self, output: SourceOutput) {
        self.model.merge(output.model);
        if self.deployment_key.is_none() {
            self.deployment_key = output.deployment_key;
        }
        self.ssh_keypair.fill_from(output.ssh_keypair);
        for file in output.added_files {
            if !self.added_files.contains(&file) {
                self.added_files.push(file);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    sources: Vec<InventorySource>,
}

impl Aggregator {
    /// Local source followed by `kinds` in order. Repeated or explicit
    /// `local` entries are dropped.
    pub fn from_kinds(kinds: &[PluginKind], ctx: &PluginContext) -> Self {
        let mut sources = vec![InventorySource::from_kind(PluginKind::Local, ctx)];
        let mut seen = vec![PluginKind::Local];
        for kind in kinds {
            if !seen.contains(kind) {
                seen.push(*kind);
                sources.push(InventorySource::from_kind(*kind, ctx));
            }
        }
        Self { sources }
    }

    /// Aggregate exactly these sources, in this order.
    pub fn new(sources: Vec<InventorySource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[InventorySource] {
        &self.sources
    }

    /// Files all sources declare, without reading them.
    pub fn declared_added_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        for file in self.sources.iter().flat_map(InventorySource::declared_added_files) {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        files
    }

    /// Read and merge every source.
    ///
    /// # Errors
    ///
    /// The first error of a source without a fallback.
    pub fn aggregate(&self) -> Result<Aggregate> {
        let mut aggregate = Aggregate::default();
        for source in &self.sources {
            let output = match source.produce() {
                Ok(output) => output,
                Err(e) => match source.fallback() {
                    Some(fallback) => {
                        warn!(source = source.name(), error = %e, "inventory source failed, using fallback");
                        aggregate.degraded.push(source.name());
                        fallback
                    }
                    None => return Err(e),
                },
            };
            debug!(source = source.name(), hosts = output.model.hosts.len(), "source merged");
            aggregate.absorb(output);
        }
        aggregate.model.normalize();

        info!(
            sources = self.sources.len(),
            hosts = aggregate.model.hosts.len(),
            groups = aggregate.model.groups.len(),
            "inventory aggregated"
        );
        Ok(aggregate)
    }
}
