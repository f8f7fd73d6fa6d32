pub mod calibration;
pub mod joint;
pub mod session;

pub use calibration::{BarCalibration, CalibrationBuilder};
pub use joint::{CoordinateSpace, JointFrame, JointId, Point};
pub use session::{Goal, WorkoutSession, WorkoutSummary};
