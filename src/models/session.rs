//! Persisted workout records.
//!
//! A `WorkoutSession` is built exactly once when a tracking session finalizes
//! and is never mutated afterward; history only ever grows by appending.

use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Target repetition count. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Goal(NonZeroU32);

impl Goal {
    pub const DEFAULT: Goal = match NonZeroU32::new(10) {
        Some(reps) => Goal(reps),
        None => unreachable!(),
    };

    pub fn new(reps: u32) -> Result<Self> {
        NonZeroU32::new(reps)
            .map(Goal)
            .ok_or_else(|| anyhow!("goal must be greater than zero"))
    }

    /// Parses user input such as "10". Zero, negatives and non-numbers are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let reps: u32 = input
            .trim()
            .parse()
            .with_context(|| format!("'{}' is not a valid rep count", input.trim()))?;
        Self::new(reps)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    pub reps_completed: u32,
    /// Whole seconds spent tracking.
    pub time_taken: u32,
    /// When tracking started, not when the record was created.
    pub date: DateTime<Utc>,
    pub goal: u32,
}

impl WorkoutSession {
    pub fn new(reps_completed: u32, time_taken: u32, date: DateTime<Utc>, goal: Goal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reps_completed,
            time_taken,
            date,
            goal: goal.get(),
        }
    }

    pub fn goal_met(&self) -> bool {
        self.reps_completed >= self.goal
    }
}

/// What the summary screen shows after a workout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub session_id: String,
    pub date: DateTime<Utc>,
    pub goal: u32,
    pub reps_completed: u32,
    pub time_taken: u32,
    pub goal_met: bool,
}

impl From<&WorkoutSession> for WorkoutSummary {
    fn from(session: &WorkoutSession) -> Self {
        Self {
            session_id: session.id.clone(),
            date: session.date,
            goal: session.goal,
            reps_completed: session.reps_completed,
            time_taken: session.time_taken,
            goal_met: session.goal_met(),
        }
    }
}
