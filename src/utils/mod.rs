//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Captured process output and diagnostic text extraction
//! - `shell` - Shell escaping and quoting

pub mod command;
pub mod shell;
