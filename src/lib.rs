//! Monorepo source mirroring engine.
//!
//! Keeps watched Python source directories mirrored into destination
//! workspaces of a monorepo and promotes the third-party dependencies the
//! mirrored code imports from the root `pyproject.toml` into each
//! destination's `pyproject.toml`.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]** — load and validate `molerat.json` or flag-built rules
//! - **[`deps`]** — import scanning, distribution resolution, manifest promotion
//! - **[`resources`]** — idempotent `check + apply` primitives (sync dirs, mirrored files, ignore entries)
//! - **[`tasks`]** — the per-pairing initial sync, with result recording
//! - **[`watch`]** — live mirroring on file-system events
//! - **[`commands`]** — top-level orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod deps;
pub mod error;
pub mod exec;
pub mod logging;
pub mod resources;
pub mod tasks;
pub mod watch;
