//! Inventory: model, sources, writers and aggregation.

mod aggregate;
mod merge;
mod model;
pub mod source;
mod writer;

pub use aggregate::{Aggregate, Aggregator};
pub use merge::{merge_value, merge_vars};
pub use model::{Group, InventoryModel};
pub(crate) use model::{read_yaml, write_yaml};
pub use source::{InventorySource, PluginContext, SourceOutput};
pub use writer::{InventoryWriter, SecretStoreWriter};
