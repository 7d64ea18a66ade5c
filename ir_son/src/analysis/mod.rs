//! Analyses over the control skeleton of a [`Function`](crate::Function).
//!
//! Each analysis is a snapshot of the graph at the time it was built.
//! Mutating the function afterwards invalidates it.

mod dom_tree;
mod liveness;
mod loops;
mod reg_alloc;
mod schedule;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dom_tree::DomTree;
pub use liveness::{LiveInterval, Liveness};
pub use loops::{Loop, LoopId, LoopInfo};
pub use reg_alloc::{Location, RegAlloc};
pub use schedule::{data_schedule, linearize, Schedule};
