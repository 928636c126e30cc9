// Public modules
pub mod artifact;
pub mod build;
pub mod cleanup;
pub mod config;
pub mod credential;
pub mod error;
pub mod fallback;
pub mod interrupt;
pub mod pipeline;
pub mod remote;
pub mod runner;
pub mod ssh;
pub mod transfer;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
