#![forbid(unsafe_code)]

//! Core domain model and session logic for the TMJ exercise guide.
//!
//! This crate provides:
//! - Domain types (exercises, timing patterns, session and exercise states)
//! - The built-in exercise catalog
//! - Narration over an OS text-to-speech engine
//! - Pacing clocks (real and virtual)
//! - Key-value persistence and the daily completion tally
//! - The session controller state machine

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod clock;
pub mod narrator;
pub mod store;
pub mod tally;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, SESSION_SUMMARY};
pub use config::Config;
pub use clock::{Clock, SystemClock, VirtualClock};
pub use narrator::{CommandEngine, Narrator, SpeechEngine, SpeechNarrator, Utterance, Voice};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tally::DailyTally;
pub use session::{ControlEvent, Pacing, RunOutcome, SessionController, SessionEvent, Snapshot};
