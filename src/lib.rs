/// Macro for prefixed status logging to stderr.
///
/// Usage:
/// ```ignore
/// log_status!("build", "Running {} in {}", tool, dir);
/// log_status!("transfer", "Uploaded via {}", mechanism);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        eprintln!("[{}] {}", $prefix, format_args!($($arg)*));
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `jarlift::pipeline` instead of `jarlift::core::pipeline`
pub use core::*;
pub use utils::*;
