//! Layer descriptors.
//!
//! A [`LayerNode`] describes one layer occurrence: its [`LayerType`], a
//! schema-checked [`LayerConfig`] and a rank flag telling the scheduler
//! whether the node yields a real output or is a structural placeholder.

mod node;
mod types;

pub use node::{LayerConfig, LayerNode, NodeId};
pub use types::{LayerType, ParamKind, ParamValue};
