// Shared domain types: used by the engine, the GitHub source and the notifier.
// None of those layers depends on another; all import from this module.

pub mod release;
pub mod repo;

pub use release::*;
pub use repo::*;
