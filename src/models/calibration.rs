use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::joint::{CoordinateSpace, Point};

/// The user-marked bar, fixed for the lifetime of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarCalibration {
    left: Point,
    right: Point,
}

impl BarCalibration {
    pub fn new(left: Point, right: Point) -> Self {
        Self { left, right }
    }

    /// Maps taps recorded in view coordinates into the logical space.
    pub fn from_view(
        left: Point,
        right: Point,
        view: CoordinateSpace,
        space: CoordinateSpace,
    ) -> Self {
        let sx = space.width / view.width;
        let sy = space.height / view.height;
        let map = |p: Point| Point::new(p.x * sx, p.y * sy);
        Self::new(map(left), map(right))
    }

    pub fn left(&self) -> Point {
        self.left
    }

    pub fn right(&self) -> Point {
        self.right
    }

    pub fn bar_y(&self) -> f64 {
        (self.left.y + self.right.y) / 2.0
    }
}

/// Collects the two endpoint taps, left end first.
#[derive(Debug, Clone, Default)]
pub struct CalibrationBuilder {
    points: Vec<Point>,
}

impl CalibrationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` once both ends are already marked.
    pub fn tap(&mut self, point: Point) -> bool {
        if self.points.len() >= 2 {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == 2
    }

    pub fn prompt(&self) -> &'static str {
        match self.points.len() {
            0 => "Tap the left end of the bar",
            1 => "Now tap the right end of the bar",
            _ => "Bar set! Tap 'Reset' or 'Continue'",
        }
    }

    pub fn finish(&self) -> Result<BarCalibration> {
        match self.points.as_slice() {
            [left, right] => Ok(BarCalibration::new(*left, *right)),
            other => bail!("bar calibration needs two points, got {}", other.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_y_is_endpoint_mean() {
        let bar = BarCalibration::new(Point::new(40.0, 390.0), Point::new(350.0, 410.0));
        assert_eq!(bar.bar_y(), 400.0);
    }

    #[test]
    fn builder_requires_two_taps_and_ignores_extra() {
        let mut builder = CalibrationBuilder::new();
        assert!(builder.finish().is_err());
        assert_eq!(builder.prompt(), "Tap the left end of the bar");

        assert!(builder.tap(Point::new(10.0, 400.0)));
        assert!(builder.finish().is_err());
        assert_eq!(builder.prompt(), "Now tap the right end of the bar");

        assert!(builder.tap(Point::new(380.0, 400.0)));
        assert!(!builder.tap(Point::new(200.0, 100.0)));
        assert!(builder.is_complete());

        let bar = builder.finish().unwrap();
        assert_eq!(bar.left(), Point::new(10.0, 400.0));
        assert_eq!(bar.right(), Point::new(380.0, 400.0));

        builder.reset();
        assert!(builder.points().is_empty());
    }

    #[test]
    fn view_taps_scale_into_reference_space() {
        let view = CoordinateSpace::new(780.0, 1688.0).unwrap();
        let bar = BarCalibration::from_view(
            Point::new(100.0, 800.0),
            Point::new(700.0, 800.0),
            view,
            CoordinateSpace::REFERENCE,
        );
        assert_eq!(bar.left(), Point::new(50.0, 400.0));
        assert_eq!(bar.bar_y(), 400.0);
    }
}
