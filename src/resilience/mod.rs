//! Resilience Module
//!
//! Crash recovery, panic hooks, and supervised restart tracking.
//!
//! # Philosophy
//!
//! A crash in one hologram must not take down the node (spec.md §5, §7).
//! This module provides the mechanisms: a panic hook that logs a crash
//! report before unwinding, and a restart-policy tracker (`supervisor`)
//! that the hologram registry consults to decide whether a crashed actor
//! gets restarted.

pub mod crash_log;
pub mod supervisor;

use std::panic;

/// Install panic hooks for graceful crash recovery.
///
/// # What it does
///
/// 1. Installs `color_eyre` for pretty panic reports.
/// 2. Sets up a custom panic hook that logs crash details to
///    `logs/panic_*.json`, then calls the original panic handler.
///
/// # Example
///
/// ```no_run
/// use kudzu::resilience::install_panic_hooks;
///
/// fn main() {
///     install_panic_hooks().expect("Failed to install panic hooks");
///     // ... rest of app
/// }
/// ```
pub fn install_panic_hooks() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = crash_log::log_panic(panic_info) {
            eprintln!("Failed to log crash: {e}");
        }

        eprintln!("\n=== KUDZU NODE CRASH ===");
        eprintln!("Crash logged. The supervisor will decide whether to restart.");
        eprintln!();

        default_hook(panic_info);
    }));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_panic_hooks_succeeds() {
        // color_eyre can only be installed once per process; this test
        // only verifies the call compiles and doesn't panic on the happy
        // path exercised by integration tests that run in their own binary.
        let _ = install_panic_hooks();
    }
}
