//! Topological scheduling of architecture graphs.
//!
//! [`Scheduler::plan`] linearises a graph into a [`BuildPlan`]: the order in
//! which nodes must be materialised and, for each one, the predecessor(s)
//! it binds as input. Joins wait until every real predecessor is built.
//!
//! A [`Materializer`] turns the plan into an executable model; it is the
//! only point where this crate talks to a tensor backend.

mod scheduler;
mod types;

pub use scheduler::Scheduler;
pub use types::{Binding, BuildPlan, BuiltModel, Materializer, PlanStep};
