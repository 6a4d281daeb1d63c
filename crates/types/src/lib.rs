// crates/types/src/lib.rs
pub mod insights;
pub mod job;

pub use insights::*;
pub use job::*;
