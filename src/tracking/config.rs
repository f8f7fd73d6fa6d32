use serde::{Deserialize, Serialize};

use crate::models::CoordinateSpace;

/// Tunable thresholds for alignment, countdown and rep detection.
///
/// Length values are in logical units of `reference_space`; they were tuned
/// against the 390x844 portrait frame and must be rescaled with
/// [`TrackingConfig::scaled_to`] when positions come from a different space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingConfig {
    /// Seconds shown before tracking begins.
    pub countdown_seconds: u32,

    /// Added to the bar y to compensate for wrist detection sitting below the grip.
    pub alignment_offset: f64,
    pub alignment_tolerance: f64,

    /// Upward speed (units/frame) that arms a rep while near the top band.
    pub descent_velocity: f64,
    /// Torso must be above `bar_y + descent_band` to arm.
    pub descent_band: f64,
    /// Downward speed (units/frame) that closes a rep.
    pub ascent_velocity: f64,
    /// Torso must be below `bar_y + ascent_band` to close.
    pub ascent_band: f64,

    /// Cosmetic cooldown after each counted rep.
    pub rep_lock_ms: u64,

    pub reference_space: CoordinateSpace,

    /// When set, losing alignment during the countdown returns to idle.
    pub cancel_countdown_on_misalignment: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 3,
            alignment_offset: 20.0,
            alignment_tolerance: 30.0,
            descent_velocity: 4.0,
            descent_band: 40.0,
            ascent_velocity: 4.0,
            ascent_band: 60.0,
            rep_lock_ms: 500,
            reference_space: CoordinateSpace::REFERENCE,
            cancel_countdown_on_misalignment: false,
        }
    }
}

impl TrackingConfig {
    /// Rescales every vertical threshold to `space`. All thresholds act on
    /// y values, so the height ratio is the only factor.
    pub fn scaled_to(&self, space: CoordinateSpace) -> Self {
        let ratio = space.height / self.reference_space.height;
        Self {
            alignment_offset: self.alignment_offset * ratio,
            alignment_tolerance: self.alignment_tolerance * ratio,
            descent_velocity: self.descent_velocity * ratio,
            descent_band: self.descent_band * ratio,
            ascent_velocity: self.ascent_velocity * ratio,
            ascent_band: self.ascent_band * ratio,
            reference_space: space,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_to_double_height_doubles_bands() {
        let config = TrackingConfig::default();
        let scaled = config.scaled_to(CoordinateSpace::new(780.0, 1688.0).unwrap());

        assert_eq!(scaled.descent_band, 80.0);
        assert_eq!(scaled.ascent_band, 120.0);
        assert_eq!(scaled.alignment_tolerance, 60.0);
        assert_eq!(scaled.descent_velocity, 8.0);
        assert_eq!(scaled.countdown_seconds, 3);
        assert_eq!(scaled.rep_lock_ms, 500);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{"countdownSeconds": 5, "ascentBand": 70}"#).unwrap();
        assert_eq!(config.countdown_seconds, 5);
        assert_eq!(config.ascent_band, 70.0);
        assert_eq!(config.descent_band, 40.0);
        assert!(!config.cancel_countdown_on_misalignment);
    }
}
