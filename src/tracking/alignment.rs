use crate::models::{JointFrame, JointId, Point};

use super::config::TrackingConfig;

/// Whether both wrists sit on the calibrated bar.
///
/// Missing wrists always mean "not aligned"; nothing is guessed.
pub fn wrists_near_bar(
    left_wrist: Option<Point>,
    right_wrist: Option<Point>,
    bar_y: f64,
    config: &TrackingConfig,
) -> bool {
    let (Some(left), Some(right)) = (left_wrist, right_wrist) else {
        return false;
    };

    let adjusted_bar_y = bar_y + config.alignment_offset;
    (left.y - adjusted_bar_y).abs() < config.alignment_tolerance
        && (right.y - adjusted_bar_y).abs() < config.alignment_tolerance
}

pub fn frame_is_aligned(frame: &JointFrame, bar_y: f64, config: &TrackingConfig) -> bool {
    wrists_near_bar(
        frame.get(JointId::LeftWrist),
        frame.get(JointId::RightWrist),
        bar_y,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrist(y: f64) -> Option<Point> {
        Some(Point::new(0.0, y))
    }

    #[test]
    fn wrists_just_below_bar_are_aligned() {
        let config = TrackingConfig::default();
        assert!(wrists_near_bar(wrist(420.0), wrist(420.0), 400.0, &config));
        assert!(wrists_near_bar(wrist(395.0), wrist(445.0), 400.0, &config));
    }

    #[test]
    fn wrists_outside_tolerance_are_not_aligned() {
        let config = TrackingConfig::default();
        assert!(!wrists_near_bar(wrist(460.0), wrist(460.0), 400.0, &config));
        assert!(!wrists_near_bar(wrist(420.0), wrist(450.0), 400.0, &config));
        assert!(!wrists_near_bar(wrist(390.0), wrist(420.0), 400.0, &config));
    }

    #[test]
    fn missing_wrist_is_never_aligned() {
        let config = TrackingConfig::default();
        for bar_y in [0.0, 400.0, 844.0, -50.0] {
            let on_bar = wrist(bar_y + config.alignment_offset);
            assert!(!wrists_near_bar(None, on_bar, bar_y, &config));
            assert!(!wrists_near_bar(on_bar, None, bar_y, &config));
            assert!(!wrists_near_bar(None, None, bar_y, &config));
        }
    }

    #[test]
    fn frame_without_wrists_is_not_aligned() {
        let config = TrackingConfig::default();
        let frame = JointFrame::new().with(JointId::Neck, Point::new(195.0, 420.0));
        assert!(!frame_is_aligned(&frame, 400.0, &config));

        let frame = frame
            .with(JointId::LeftWrist, Point::new(100.0, 425.0))
            .with(JointId::RightWrist, Point::new(290.0, 415.0));
        assert!(frame_is_aligned(&frame, 400.0, &config));
    }
}
