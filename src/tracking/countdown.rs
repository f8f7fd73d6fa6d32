use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "remaining")]
pub enum CountdownState {
    Idle,
    CountingDown(u32),
    Started,
}

impl Default for CountdownState {
    fn default() -> Self {
        CountdownState::Idle
    }
}

/// Gates the move from "waiting for the user" to "tracking".
///
/// Once counting down, alignment is no longer consulted unless
/// `cancel_on_misalignment` is set; once started, it is terminal.
#[derive(Debug, Clone)]
pub struct CountdownController {
    state: CountdownState,
    seconds: u32,
    cancel_on_misalignment: bool,
}

impl CountdownController {
    pub fn new(seconds: u32, cancel_on_misalignment: bool) -> Self {
        Self {
            state: CountdownState::Idle,
            seconds,
            cancel_on_misalignment,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == CountdownState::Started
    }

    /// Feeds the latest alignment. Returns the new state when it changed.
    pub fn observe_alignment(&mut self, aligned: bool) -> Option<CountdownState> {
        match self.state {
            CountdownState::Idle if aligned => {
                // A zero-length countdown starts immediately.
                self.state = if self.seconds == 0 {
                    CountdownState::Started
                } else {
                    CountdownState::CountingDown(self.seconds)
                };
                Some(self.state)
            }
            CountdownState::CountingDown(_) if !aligned && self.cancel_on_misalignment => {
                self.state = CountdownState::Idle;
                Some(self.state)
            }
            _ => None,
        }
    }

    /// Advances one second. Returns the new state when it changed.
    pub fn tick(&mut self) -> Option<CountdownState> {
        match self.state {
            CountdownState::CountingDown(n) if n > 1 => {
                self.state = CountdownState::CountingDown(n - 1);
                Some(self.state)
            }
            CountdownState::CountingDown(_) => {
                self.state = CountdownState::Started;
                Some(self.state)
            }
            CountdownState::Idle | CountdownState::Started => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_three_two_one_then_starts() {
        let mut countdown = CountdownController::new(3, false);
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.observe_alignment(false), None);

        assert_eq!(
            countdown.observe_alignment(true),
            Some(CountdownState::CountingDown(3))
        );
        assert_eq!(countdown.tick(), Some(CountdownState::CountingDown(2)));
        assert_eq!(countdown.tick(), Some(CountdownState::CountingDown(1)));
        assert_eq!(countdown.tick(), Some(CountdownState::Started));
        assert!(countdown.is_started());
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn losing_alignment_mid_countdown_does_not_reset_by_default() {
        let mut countdown = CountdownController::new(3, false);
        countdown.observe_alignment(true);
        countdown.tick();

        assert_eq!(countdown.observe_alignment(false), None);
        assert_eq!(countdown.state(), CountdownState::CountingDown(2));
        // Re-alignment does not restart the count either.
        assert_eq!(countdown.observe_alignment(true), None);
        assert_eq!(countdown.state(), CountdownState::CountingDown(2));
    }

    #[test]
    fn opt_in_cancellation_returns_to_idle() {
        let mut countdown = CountdownController::new(3, true);
        countdown.observe_alignment(true);
        countdown.tick();

        assert_eq!(countdown.observe_alignment(false), Some(CountdownState::Idle));
        assert_eq!(countdown.tick(), None);
        assert_eq!(
            countdown.observe_alignment(true),
            Some(CountdownState::CountingDown(3))
        );
    }

    #[test]
    fn started_ignores_alignment() {
        let mut countdown = CountdownController::new(1, true);
        countdown.observe_alignment(true);
        assert_eq!(countdown.tick(), Some(CountdownState::Started));
        assert_eq!(countdown.observe_alignment(false), None);
        assert!(countdown.is_started());
    }
}
