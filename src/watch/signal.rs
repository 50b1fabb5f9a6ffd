//! Stop flag shared between the interrupt handler and every watch thread.
//!
//! `StopSignal` wraps an `Arc<AtomicBool>` but exposes only the operations
//! the live engine needs: [`StopSignal::raise`] (called from the Ctrl+C
//! handler) and [`StopSignal::is_raised`] (polled by each watch thread).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cheaply-clonable flag asking every watch thread to stop.
#[derive(Debug, Clone)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a new signal in the "running" state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            raised: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask every watch thread to stop after the event in hand.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Returns `true` once [`Self::raise`] has been called.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Raise this signal when the process receives Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already installed or the platform
    /// refuses the registration.
    pub fn raise_on_interrupt(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || signal.raise())
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_signal_is_not_raised() {
        assert!(!StopSignal::new().is_raised());
    }

    #[test]
    fn raise_sets_flag() {
        let sig = StopSignal::new();
        sig.raise();
        assert!(sig.is_raised());
    }

    #[test]
    fn clone_sees_same_state() {
        let sig = StopSignal::new();
        let cloned = sig.clone();
        sig.raise();
        assert!(cloned.is_raised());
    }
}
