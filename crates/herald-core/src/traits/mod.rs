//! Collaborator traits the engine is written against.

mod catalog;
mod history;
mod queue;

pub use catalog::*;
pub use history::*;
pub use queue::*;
