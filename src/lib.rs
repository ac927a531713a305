//! ghist: a personal toolkit for GitHub issue trackers.
//!
//! The crate mirrors a remote issue tracker into a local append-only
//! raw-event store, projects that store into a normalized history of
//! discrete actions, and supports editing issues through a plain-text
//! rendering that round-trips through any external editor.
//!
//! # Architecture
//!
//! - [`remote`]: blocking HTTP transport with retry/backoff and pagination
//! - [`storage`]: SQLite raw-event store and per-project sync checkpoints
//! - [`sync`]: incremental synchronizer driving transport into storage
//! - [`history`]: replay of raw events into normalized history actions
//! - [`edit`]: text-form rendering, parse/diff, and mutation apply
//! - [`report`]: activity aggregation over the derived history

pub mod cli;
pub mod config;
pub mod edit;
pub mod error;
pub mod history;
pub mod logging;
pub mod model;
pub mod remote;
pub mod report;
pub mod storage;
pub mod sync;

pub use error::{GhistError, Result};
