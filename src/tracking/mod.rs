pub mod alignment;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod frames;
pub mod rep_counter;
pub mod state;

pub use alignment::{frame_is_aligned, wrists_near_bar};
pub use config::TrackingConfig;
pub use controller::WorkoutController;
pub use countdown::{CountdownController, CountdownState};
pub use frames::{FrameSlot, InferenceGate, InferencePermit};
pub use rep_counter::{RepCounter, RepEvent};
pub use state::{FrameOutcome, TickOutcome, TrackingSession, TrackingStatus, WorkoutSnapshot};
