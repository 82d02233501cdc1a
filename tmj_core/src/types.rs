//! Core domain types for the TMJ exercise guide.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises, their timing rules and narration texts
//! - Session (outer) and exercise (inner) states
//! - The catalog and session summary

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Exercise Types
// ============================================================================

/// Timing rules for an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timing {
    pub repetitions: u32,
    /// Hold duration in seconds
    #[serde(default)]
    pub hold_duration: Option<u32>,
    #[serde(default)]
    pub is_breathing: bool,
    /// Bilateral exercise: all reps on the left, then all reps on the right
    #[serde(default)]
    pub has_sides: bool,
}

/// The executing sub-path an exercise takes, derived from its timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingPattern {
    /// Paced breaths, no rest between reps
    Breathing,
    /// Timed hold with a spoken countdown
    Hold(u32),
    /// Plain movement followed by a short rest
    Repetition,
}

impl Timing {
    /// Breathing wins over hold, hold wins over plain repetition
    pub fn pattern(&self) -> TimingPattern {
        if self.is_breathing {
            TimingPattern::Breathing
        } else if let Some(secs) = self.hold_duration {
            TimingPattern::Hold(secs)
        } else {
            TimingPattern::Repetition
        }
    }

    /// Total reps across both sides
    pub fn total_reps(&self) -> u32 {
        if self.has_sides {
            self.repetitions * 2
        } else {
            self.repetitions
        }
    }
}

/// Narration texts for each phase of an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioInstructions {
    pub introduction: String,
    pub preparation: String,
    /// Spoken before every rep, followed by the rep number
    pub execution: String,
    /// Only used by hold exercises
    #[serde(default)]
    pub hold: Option<String>,
    pub completion: String,
}

/// A single guided exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub instructions: Vec<String>,
    pub timing: Timing,
    pub safety_notes: Vec<String>,
    pub audio_instructions: AudioInstructions,
}

// ============================================================================
// Session and State Types
// ============================================================================

/// Outer state: progress across the whole session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Ready,
    Intro,
    Exercising,
    Completed,
}

/// Inner state: progress within the current exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseState {
    Intro,
    Preparation,
    Executing,
    Holding,
    Resting,
    Completed,
}

impl ExerciseState {
    /// Short status label shown while the state is active
    pub fn label(&self) -> &'static str {
        match self {
            ExerciseState::Intro => "Getting ready...",
            ExerciseState::Preparation => "Preparing...",
            ExerciseState::Executing => "Performing exercise...",
            ExerciseState::Holding => "Hold position",
            ExerciseState::Resting => "Rest",
            ExerciseState::Completed => "Complete!",
        }
    }
}

/// Side of the jaw worked by a bilateral exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

// ============================================================================
// Catalog Types
// ============================================================================

/// Ordered list of exercises, traversed in `id` order
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
}

impl Catalog {
    pub fn new(exercises: Vec<Exercise>) -> Self {
        Self { exercises }
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }

    /// Look up an exercise by its ordinal id
    pub fn find(&self, id: u32) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }
}

/// Overview shown before a session starts
#[derive(Clone, Copy, Debug)]
pub struct SessionSummary {
    pub total_exercises: usize,
    pub estimated_duration: &'static str,
    /// Recommended sessions per day
    pub daily_frequency: u32,
    pub minimum_weeks: u32,
    pub general_safety_note: &'static str,
}

impl SessionSummary {
    /// Encouragement line for the given count of sessions done today
    pub fn daily_goal_message(&self, sessions_today: u32) -> String {
        if sessions_today >= self.daily_frequency {
            "You've completed your daily goal!".to_string()
        } else {
            format!(
                "{} more sessions recommended today",
                self.daily_frequency - sessions_today
            )
        }
    }
}
