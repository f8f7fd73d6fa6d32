use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Joints the engine consumes. Anything else the pose model reports is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JointId {
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftWrist,
    RightWrist,
}

impl JointId {
    /// Accepts both the camelCase wire names and snake_case aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "neck" => Some(JointId::Neck),
            "leftShoulder" | "left_shoulder" => Some(JointId::LeftShoulder),
            "rightShoulder" | "right_shoulder" => Some(JointId::RightShoulder),
            "leftWrist" | "left_wrist" => Some(JointId::LeftWrist),
            "rightWrist" | "right_wrist" => Some(JointId::RightWrist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Logical coordinate space all positions and thresholds live in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub width: f64,
    pub height: f64,
}

impl CoordinateSpace {
    /// Portrait phone frame the thresholds were tuned against.
    pub const REFERENCE: CoordinateSpace = CoordinateSpace {
        width: 390.0,
        height: 844.0,
    };

    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) {
            bail!("coordinate space must have positive size, got {width}x{height}");
        }
        Ok(Self { width, height })
    }
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// One snapshot of detected joints. A missing entry means "not detected".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointFrame {
    joints: HashMap<JointId, Point>,
}

impl JointFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, joint: JointId, point: Point) -> Self {
        self.joints.insert(joint, point);
        self
    }

    pub fn insert(&mut self, joint: JointId, point: Point) {
        self.joints.insert(joint, point);
    }

    pub fn get(&self, joint: JointId) -> Option<Point> {
        self.joints.get(&joint).copied()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Builds a frame from pose-model output in normalized image coordinates
    /// (origin bottom-left, both axes 0..1). Unknown joint names are skipped.
    pub fn from_normalized<'a, I>(points: I, space: CoordinateSpace) -> Self
    where
        I: IntoIterator<Item = (&'a str, Point)>,
    {
        let mut frame = Self::new();
        for (name, p) in points {
            if let Some(joint) = JointId::parse(name) {
                frame.insert(
                    joint,
                    Point::new(p.x * space.width, (1.0 - p.y) * space.height),
                );
            }
        }
        frame
    }

    /// Vertical torso scalar: mean y of both shoulders and the neck.
    /// `None` unless all three are present.
    pub fn torso_y(&self) -> Option<f64> {
        let left = self.get(JointId::LeftShoulder)?;
        let right = self.get(JointId::RightShoulder)?;
        let neck = self.get(JointId::Neck)?;
        Some((left.y + right.y + neck.y) / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torso_y_requires_all_three_joints() {
        let frame = JointFrame::new()
            .with(JointId::LeftShoulder, Point::new(100.0, 300.0))
            .with(JointId::RightShoulder, Point::new(200.0, 330.0));
        assert_eq!(frame.torso_y(), None);

        let frame = frame.with(JointId::Neck, Point::new(150.0, 270.0));
        assert_eq!(frame.torso_y(), Some(300.0));
    }

    #[test]
    fn normalized_points_flip_the_vertical_axis() {
        let frame = JointFrame::from_normalized(
            [
                ("neck", Point::new(0.5, 0.75)),
                ("left_wrist", Point::new(0.0, 1.0)),
                ("nose", Point::new(0.5, 0.5)),
            ],
            CoordinateSpace::REFERENCE,
        );

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(JointId::Neck), Some(Point::new(195.0, 211.0)));
        assert_eq!(frame.get(JointId::LeftWrist), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn rejects_degenerate_space() {
        assert!(CoordinateSpace::new(0.0, 844.0).is_err());
        assert!(CoordinateSpace::new(390.0, -1.0).is_err());
        assert!(CoordinateSpace::new(390.0, 844.0).is_ok());
    }
}
