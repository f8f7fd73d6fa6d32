//! Direction-aware repetition detection on the vertical torso position.
//!
//! Screen y grows downward. A rep is armed when the torso rises quickly while
//! inside the top band (`bar_y + descent_band`), and closed when it drops
//! quickly past the lower band (`bar_y + ascent_band`). A closed rep disarms
//! the counter, so the next one needs the full cycle again; jitter that never
//! crosses both bands with enough speed cannot count twice.

use std::time::{Duration, Instant};

use super::config::TrackingConfig;
use crate::models::Goal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepEvent {
    /// Nothing counted on this sample.
    None,
    /// A rep was counted; carries the new total.
    Counted(u32),
    /// The rep that met the goal.
    GoalReached(u32),
}

#[derive(Debug, Clone)]
pub struct RepCounter {
    goal: Goal,
    bar_y: f64,
    descent_velocity: f64,
    descent_band: f64,
    ascent_velocity: f64,
    ascent_band: f64,
    rep_lock: Duration,

    last_y: Option<f64>,
    going_down: bool,
    rep_count: u32,
    locked_until: Option<Instant>,
}

impl RepCounter {
    pub fn new(goal: Goal, bar_y: f64, config: &TrackingConfig) -> Self {
        Self {
            goal,
            bar_y,
            descent_velocity: config.descent_velocity,
            descent_band: config.descent_band,
            ascent_velocity: config.ascent_velocity,
            ascent_band: config.ascent_band,
            rep_lock: Duration::from_millis(config.rep_lock_ms),
            last_y: None,
            going_down: false,
            rep_count: 0,
            locked_until: None,
        }
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn going_down(&self) -> bool {
        self.going_down
    }

    pub fn last_y(&self) -> Option<f64> {
        self.last_y
    }

    pub fn goal_reached(&self) -> bool {
        self.rep_count >= self.goal.get()
    }

    /// Cosmetic cooldown after a counted rep; does not suppress counting.
    pub fn is_rep_locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Feeds one torso sample. Samples after the goal is met are ignored.
    pub fn observe(&mut self, avg_y: f64, now: Instant) -> RepEvent {
        if self.goal_reached() {
            return RepEvent::None;
        }

        let mut event = RepEvent::None;

        if let Some(last_y) = self.last_y {
            let velocity = avg_y - last_y;

            if !self.going_down
                && velocity < -self.descent_velocity
                && avg_y < self.bar_y + self.descent_band
            {
                self.going_down = true;
            } else if self.going_down
                && velocity > self.ascent_velocity
                && avg_y > self.bar_y + self.ascent_band
            {
                self.rep_count += 1;
                self.going_down = false;
                self.locked_until = Some(now + self.rep_lock);

                event = if self.goal_reached() {
                    RepEvent::GoalReached(self.rep_count)
                } else {
                    RepEvent::Counted(self.rep_count)
                };
            }
        }

        self.last_y = Some(avg_y);
        event
    }
}
