mod file;
mod region;

pub use file::{FileHooks, HttpFile};
pub use region::{ExecutionState, HttpRegion};
