pub mod storage;
pub mod streak;

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::Local;
use log::info;

use crate::models::WorkoutSession;

pub use storage::{HistoryRepository, JsonFileBackend, KeyValueBackend, SqliteBackend, HISTORY_KEY};
pub use streak::calculate_streak;

/// Sessions shown on the progress chart.
pub const RECENT_CHART_SESSIONS: usize = 4;

/// Process-wide workout history: loaded once, append-only, fully rewritten
/// to storage on every append. Appends are serialized by the history lock,
/// so only one whole-history write is ever in flight.
pub struct SessionStore {
    sessions: Mutex<Vec<WorkoutSession>>,
    repository: HistoryRepository,
}

impl SessionStore {
    pub fn new(repository: HistoryRepository) -> Self {
        let sessions = repository.load();
        info!("Loaded {} workout sessions", sessions.len());
        Self {
            sessions: Mutex::new(sessions),
            repository,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WorkoutSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Appends and persists the full history. On a write failure the record
    /// stays in memory and the next successful append persists it.
    pub fn add_session(&self, session: WorkoutSession) -> Result<()> {
        let mut sessions = self.lock();
        info!(
            "Recording session {} ({}/{} reps, {}s)",
            session.id, session.reps_completed, session.goal, session.time_taken
        );
        sessions.push(session);
        self.repository.save(&sessions)
    }

    /// Insertion-ordered copy of the history.
    pub fn sessions(&self) -> Vec<WorkoutSession> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn calculate_streak(&self) -> u32 {
        calculate_streak(&self.lock(), &Local::now())
    }

    /// The last `count` sessions in insertion order.
    pub fn recent(&self, count: usize) -> Vec<WorkoutSession> {
        let sessions = self.lock();
        let start = sessions.len().saturating_sub(count);
        sessions[start..].to_vec()
    }

    pub fn history_newest_first(&self) -> Vec<WorkoutSession> {
        self.lock().iter().rev().cloned().collect()
    }

    pub fn goal_met_count(&self) -> usize {
        self.lock().iter().filter(|s| s.goal_met()).count()
    }

    pub fn total_reps(&self) -> u64 {
        self.lock()
            .iter()
            .map(|s| u64::from(s.reps_completed))
            .sum()
    }
}
