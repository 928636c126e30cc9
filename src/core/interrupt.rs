//! Operator interrupt (Ctrl-C) tracking.
//!
//! Child processes share the terminal's process group, so Ctrl-C reaches
//! them directly; the handler here only records that it happened so the
//! pipeline can stop before starting anything else. Once the run is over
//! and only waiting on the operator, Ctrl-C ends the process instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
    exit_on_signal: Arc<AtomicBool>,
}

/// Interrupts exit like every other failure.
const INTERRUPT_EXIT_CODE: i32 = 1;

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a process-wide Ctrl-C handler that trips this flag.
    pub fn install(&self) -> Result<()> {
        let state = self.clone();
        ctrlc::set_handler(move || {
            if state.on_signal() {
                eprintln!();
                std::process::exit(INTERRUPT_EXIT_CODE);
            }
        })
        .map_err(|e| Error::internal_unexpected(format!("Failed to set Ctrl-C handler: {}", e)))
    }

    /// Record a Ctrl-C. Returns true when the process should exit now.
    fn on_signal(&self) -> bool {
        self.flag.store(true, Ordering::SeqCst);
        self.exit_on_signal.load(Ordering::SeqCst)
    }

    /// Make the next Ctrl-C terminate the process, e.g. while blocked on
    /// "Press Enter to exit..." where nothing polls the flag.
    pub fn exit_on_signal(&self) {
        self.exit_on_signal.store(true, Ordering::SeqCst);
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with `run.interrupted` if the operator has interrupted.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_set() {
            Err(Error::interrupted(stage))
        } else {
            Ok(())
        }
    }
}
