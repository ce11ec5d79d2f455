pub mod interval;
pub mod loader;
pub mod repositories;
pub mod types;

pub use repositories::build_registry;
pub use types::{FileConfig, LogFormat, Overrides, Settings};
