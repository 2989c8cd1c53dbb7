//! Binary partition tree over the reference graph.
//!
//! - `PartitionNode` / `PartitionTree` - the tree and its accessors
//! - `PartitionTreeBuilder` - balanced competitive growth from spatial seeds
//! - `persist` - per-node `.vert` / `.cross` files

mod builder;
mod node;
pub mod persist;

pub use builder::{BuildParams, PartitionTreeBuilder};
pub use node::{PartitionNode, PartitionTree};
