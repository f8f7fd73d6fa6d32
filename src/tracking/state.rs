use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BarCalibration, Goal, JointFrame, WorkoutSession};

use super::{
    alignment::frame_is_aligned,
    config::TrackingConfig,
    countdown::{CountdownController, CountdownState},
    rep_counter::{RepCounter, RepEvent},
};

// Per-frame logging is noisy; flip on when debugging detection.
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingStatus {
    Idle,
    CountingDown,
    Tracking,
    /// Goal reached.
    Completed,
    /// Ended by the user.
    Stopped,
    /// Abandoned; nothing is recorded.
    Cancelled,
}

impl Default for TrackingStatus {
    fn default() -> Self {
        TrackingStatus::Idle
    }
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Idle => "Idle",
            TrackingStatus::CountingDown => "CountingDown",
            TrackingStatus::Tracking => "Tracking",
            TrackingStatus::Completed => "Completed",
            TrackingStatus::Stopped => "Stopped",
            TrackingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackingStatus::Completed | TrackingStatus::Stopped | TrackingStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Session already ended; the frame was dropped.
    Ignored,
    /// Alignment or smoothing state may have moved; no rep.
    Updated,
    RepCounted(u32),
    /// The goal rep; carries the finalized record.
    Finished(WorkoutSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    None,
    Countdown(u32),
    TrackingStarted,
    Elapsed(u32),
}

/// Read-only view handed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSnapshot {
    pub status: TrackingStatus,
    pub aligned: bool,
    pub countdown: Option<u32>,
    pub rep_count: u32,
    pub goal: u32,
    pub elapsed_secs: u32,
    pub completed: bool,
    pub rep_locked: bool,
    pub prompt: Option<&'static str>,
}

/// One workout attempt, from waiting for alignment to the final record.
///
/// All mutation goes through `&mut self`; the owner decides which execution
/// context drives it.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    goal: Goal,
    bar_y: f64,
    config: TrackingConfig,
    status: TrackingStatus,
    aligned: bool,
    countdown: CountdownController,
    rep_counter: RepCounter,
    elapsed_secs: u32,
    started_at: Option<DateTime<Utc>>,
    frames_skipped: u64,
}

impl TrackingSession {
    pub fn new(goal: Goal, calibration: BarCalibration, config: TrackingConfig) -> Self {
        let bar_y = calibration.bar_y();
        Self {
            goal,
            bar_y,
            countdown: CountdownController::new(
                config.countdown_seconds,
                config.cancel_countdown_on_misalignment,
            ),
            rep_counter: RepCounter::new(goal, bar_y, &config),
            config,
            status: TrackingStatus::Idle,
            aligned: false,
            elapsed_secs: 0,
            started_at: None,
            frames_skipped: 0,
        }
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_counter.rep_count()
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    /// Tracking frames that lacked a torso joint.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.state()
    }

    pub fn handle_frame(&mut self, frame: &JointFrame, now: Instant) -> FrameOutcome {
        if self.status.is_terminal() {
            return FrameOutcome::Ignored;
        }

        self.aligned = frame_is_aligned(frame, self.bar_y, &self.config);

        if !self.countdown.is_started() {
            match self.countdown.observe_alignment(self.aligned) {
                Some(CountdownState::CountingDown(n)) => {
                    log_info!("Wrists aligned, countdown from {}", n);
                    self.status = TrackingStatus::CountingDown;
                }
                Some(CountdownState::Idle) => {
                    log_info!("Alignment lost, countdown cancelled");
                    self.status = TrackingStatus::Idle;
                }
                Some(CountdownState::Started) => self.begin_tracking(),
                None => {}
            }
            return FrameOutcome::Updated;
        }

        let Some(avg_y) = frame.torso_y() else {
            self.frames_skipped += 1;
            log_debug!("Frame missing torso joints, skipped");
            return FrameOutcome::Updated;
        };

        match self.rep_counter.observe(avg_y, now) {
            RepEvent::None => FrameOutcome::Updated,
            RepEvent::Counted(count) => {
                log_info!("Rep {} of {}", count, self.goal.get());
                FrameOutcome::RepCounted(count)
            }
            RepEvent::GoalReached(count) => {
                log_info!("Goal of {} reps reached", count);
                match self.finalize(TrackingStatus::Completed) {
                    Some(session) => FrameOutcome::Finished(session),
                    None => FrameOutcome::Ignored,
                }
            }
        }
    }

    /// Advances the one-second clock shared by the countdown and the timer.
    pub fn tick(&mut self) -> TickOutcome {
        match self.status {
            TrackingStatus::CountingDown => match self.countdown.tick() {
                Some(CountdownState::CountingDown(n)) => TickOutcome::Countdown(n),
                Some(CountdownState::Started) => {
                    self.begin_tracking();
                    TickOutcome::TrackingStarted
                }
                _ => TickOutcome::None,
            },
            TrackingStatus::Tracking => {
                self.elapsed_secs = self.elapsed_secs.saturating_add(1);
                TickOutcome::Elapsed(self.elapsed_secs)
            }
            _ => TickOutcome::None,
        }
    }

    /// User-initiated end. Always yields a record unless the session was
    /// already finalized; stopping before tracking records zero reps.
    pub fn stop(&mut self) -> Option<WorkoutSession> {
        if matches!(
            self.status,
            TrackingStatus::Idle | TrackingStatus::CountingDown
        ) {
            log_info!("Session stopped before tracking started");
        }
        self.finalize(TrackingStatus::Stopped)
    }

    /// Abandons the session without producing a record.
    pub fn cancel(&mut self) {
        if !self.status.is_terminal() {
            self.status = TrackingStatus::Cancelled;
        }
    }

    pub fn snapshot(&self, now: Instant) -> WorkoutSnapshot {
        let countdown = match self.countdown.state() {
            CountdownState::CountingDown(n) if self.status == TrackingStatus::CountingDown => {
                Some(n)
            }
            _ => None,
        };

        let prompt = match self.status {
            TrackingStatus::Idle | TrackingStatus::CountingDown => Some(if self.aligned {
                "Wrist position OK – Starting soon..."
            } else {
                "Align both wrists with the bar to begin"
            }),
            _ => None,
        };

        WorkoutSnapshot {
            status: self.status,
            aligned: self.aligned,
            countdown,
            rep_count: self.rep_count(),
            goal: self.goal.get(),
            elapsed_secs: self.elapsed_secs,
            completed: self.status == TrackingStatus::Completed,
            rep_locked: self.rep_counter.is_rep_locked(now),
            prompt,
        }
    }

    fn begin_tracking(&mut self) {
        self.status = TrackingStatus::Tracking;
        self.started_at = Some(Utc::now());
        self.elapsed_secs = 0;
        log_info!("Tracking started, goal {} reps", self.goal.get());
    }

    fn finalize(&mut self, status: TrackingStatus) -> Option<WorkoutSession> {
        if self.status.is_terminal() {
            return None;
        }
        // Never started tracking: date the record at the stop.
        let started_at = self.started_at.unwrap_or_else(Utc::now);
        self.status = status;

        let session = WorkoutSession::new(
            self.rep_count(),
            self.elapsed_secs,
            started_at,
            self.goal,
        );
        log_info!(
            "Session {} finalized as {}: {}/{} reps in {}s",
            session.id,
            status.as_str(),
            session.reps_completed,
            session.goal,
            session.time_taken
        );
        Some(session)
    }
}
