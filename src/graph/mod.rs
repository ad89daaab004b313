//! Architecture graph: layer nodes, edges, branches and history.
//!
//! # Structure
//!
//! A graph always has one `Input` node and one `Output` finisher. Layers
//! are added at the end of *open branches*; splitting a branch forks the
//! network into parallel paths and merging joins their ends through a new
//! layer. Until merged, every open end feeds the finisher directly.
//!
//! # Persistence
//!
//! [`ArchitectureGraph::to_json`] and [`ArchitectureGraph::from_json`]
//! round-trip the full state, lineage included.

mod persist;
mod structure;
mod types;

pub use persist::{BranchRecord, GraphSnapshot, NodeRecord};
pub use structure::ArchitectureGraph;
pub use types::{Branch, BranchId, BranchState, Lineage, MutationRecord, RecordKind};
