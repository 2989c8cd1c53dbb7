//! Public query API.
//!
//! # Example
//!
//! ```ignore
//! use kcpjoin_core::api::{build_partition_tree, closest_pairs};
//!
//! let tree = build_partition_tree(graph, &coords, 16, 0.5)?;
//! let pairs = closest_pairs(&tree, &r, &s, 10, f32::INFINITY, 0)?;
//! ```

pub mod builder;
pub mod high_level;

pub use builder::QueryBuilder;
pub use high_level::{build_partition_tree, closest_pairs, closest_pairs_with};
