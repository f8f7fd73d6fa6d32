//! Feeds recorded pose frames through a live [`WorkoutController`].
//!
//! Input is JSON lines, one frame per line:
//!
//! ```text
//! {"tMs": 0, "joints": {"neck": [195.0, 480.0], "leftWrist": [90.0, 421.0]}}
//! {"tMs": 33, "normalized": true, "joints": {"neck": [0.5, 0.43]}}
//! ```
//!
//! Frames marked `normalized` carry pose-model coordinates and are mapped into
//! the logical space first.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::time::{sleep_until, Instant};

use crate::{
    models::{BarCalibration, Goal, JointFrame, JointId, Point, WorkoutSession},
    settings::AppSettings,
    store::SessionStore,
    tracking::{InferenceGate, TrackingSession, WorkoutController, WorkoutSnapshot},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedFrame {
    pub t_ms: u64,
    #[serde(default)]
    pub normalized: bool,
    #[serde(default)]
    pub joints: HashMap<String, [f64; 2]>,
}

impl RecordedFrame {
    pub fn to_joint_frame(&self, settings: &AppSettings) -> JointFrame {
        let points = self
            .joints
            .iter()
            .map(|(name, [x, y])| (name.as_str(), Point::new(*x, *y)));

        if self.normalized {
            return JointFrame::from_normalized(points, settings.tracking.reference_space);
        }

        let mut frame = JointFrame::new();
        for (name, point) in points {
            match JointId::parse(name) {
                Some(joint) => frame.insert(joint, point),
                None => log_warn!("Ignoring unknown joint '{}'", name),
            }
        }
        frame
    }
}

pub fn read_frames(path: &Path) -> Result<Vec<RecordedFrame>> {
    let file =
        File::open(path).with_context(|| format!("failed to open frames {}", path.display()))?;

    let mut frames = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame: RecordedFrame = serde_json::from_str(line)
            .with_context(|| format!("invalid frame on line {}", index + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub goal: Goal,
    pub bar: BarCalibration,
    /// Playback rate; 2.0 replays twice as fast, ticks included.
    pub speed: f64,
}

#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub record: Option<WorkoutSession>,
    pub snapshot: WorkoutSnapshot,
    pub frames_offered: usize,
    pub frames_skipped_busy: u64,
    pub streak: u32,
}

/// Replays `frames` in recorded timing and returns the resulting record.
/// Runs until the goal is reached or the recording ends, whichever is first.
pub async fn replay(
    frames: Vec<RecordedFrame>,
    options: &ReplayOptions,
    settings: &AppSettings,
    store: Arc<SessionStore>,
) -> Result<ReplayReport> {
    if !(options.speed > 0.0 && options.speed.is_finite()) {
        bail!("replay speed must be a positive number, got {}", options.speed);
    }

    let tick_interval = settings.tick_interval().div_f64(options.speed);
    let session = TrackingSession::new(options.goal, options.bar, settings.tracking.clone());
    let controller = WorkoutController::start(session, Arc::clone(&store), tick_interval)?;
    let sink = controller.frame_sink();
    let gate = InferenceGate::new();

    log_info!(
        "Replaying {} frames at {}x, goal {}",
        frames.len(),
        options.speed,
        options.goal.get()
    );

    let origin = Instant::now();
    let first_ms = frames.first().map(|f| f.t_ms).unwrap_or(0);
    let frames_offered = frames.len();

    for recorded in frames {
        if controller.is_finished() {
            break;
        }

        let offset = Duration::from_millis(recorded.t_ms.saturating_sub(first_ms));
        sleep_until(origin + offset.div_f64(options.speed)).await;

        // The previous frame is still being converted; drop this one.
        let Some(permit) = gate.try_acquire() else {
            continue;
        };
        let sink = sink.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            let _permit = permit;
            sink.push(recorded.to_joint_frame(&settings));
        });
        tokio::task::yield_now().await;
    }

    let record = if controller.is_finished() {
        controller.wait().await?
    } else {
        log_info!("Recording ended before the goal; stopping session");
        controller.stop().await?
    };

    Ok(ReplayReport {
        record,
        snapshot: controller.snapshot(),
        frames_offered,
        frames_skipped_busy: gate.skipped(),
        streak: store.calculate_streak(),
    })
}
