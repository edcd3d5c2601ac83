#![forbid(unsafe_code)]

//! Core domain model and session logic for Morning Practice.
//!
//! This crate provides:
//! - Domain types (exercises, stages)
//! - The built-in exercise catalog and shuffling
//! - The session state machine and its countdown timer
//! - Narration and chime output
//! - A tokio runtime tying them together

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod shuffle;
pub mod timer;
pub mod prompts;
pub mod machine;
pub mod narrator;
pub mod chime;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use machine::{Effect, Event, SessionState, Timings};
pub use narrator::Narrator;
pub use chime::Chime;
pub use session::{PracticeRun, Session};
