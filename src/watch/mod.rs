//! Live mirroring of watch directories after the initial sync.
//!
//! Each pairing gets its own subscription on a [`WatchSource`] and its own
//! delivery thread; events are applied synchronously in that thread, in the
//! order the source delivers them. Nothing orders events across pairings.
pub mod engine;
pub mod handler;
pub mod signal;
pub mod source;

pub use engine::LiveWatch;
pub use handler::{EventOutcome, PairingHandler, WatchState};
pub use signal::StopSignal;
pub use source::{ChannelWatchSource, FileEvent, FileEventKind, NotifySource, WatchSource};
