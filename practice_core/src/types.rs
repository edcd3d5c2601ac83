//! Core domain types for the Morning Practice system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise records and the catalog that owns them
//! - Session stages
//! - Clock formatting for the presentation layer

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Exercise Types
// ============================================================================

/// A single exercise: what to do and how to do it
///
/// Records are owned by the catalog and copied into a session's selection;
/// they are never mutated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseRecord {
    pub name: String,
    pub description: String,
}

impl ExerciseRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Text spoken before the exercise starts: "<name>. <description>"
    pub fn instructions(&self) -> String {
        format!("{}. {}", self.name, self.description)
    }
}

/// The fixed list of exercises a session draws from
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: Vec<ExerciseRecord>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Stage of a practice session
///
/// Stages only move forward; a reset is the one way back to `Start`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Start,
    WarmUp,
    Exercise,
    CoolDown,
    Complete,
}

impl Stage {
    /// Human-readable stage title
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Start => "Ready",
            Stage::WarmUp => "Warm Up",
            Stage::Exercise => "Exercise",
            Stage::CoolDown => "Cool Down",
            Stage::Complete => "Complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Format a number of seconds as `M:SS`
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
