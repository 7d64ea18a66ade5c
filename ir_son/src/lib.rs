//! Sea-of-Nodes intermediate representation.
//!
//! Control flow and data flow live in one graph owned by a [`Function`].
//! Basic blocks are not stored; they are recovered by the analyses in
//! [`analysis`], which also schedule the graph back into a linear form and
//! allocate registers for it.

pub mod analysis;
mod error;
mod function;
mod graph;
mod pretty;
mod region;
mod syntax;
mod verify;

pub use error::*;
pub use function::*;
pub use pretty::*;
pub use syntax::*;
