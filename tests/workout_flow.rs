//! End-to-end: frames through a live controller into persisted history.

use std::time::Duration;

use repcount_lib::{
    models::{BarCalibration, Goal, JointFrame, JointId, Point},
    tracking::{TrackingStatus, WorkoutController},
    AppState,
};

fn bar() -> BarCalibration {
    BarCalibration::new(Point::new(20.0, 400.0), Point::new(370.0, 400.0))
}

fn hanging() -> JointFrame {
    JointFrame::new()
        .with(JointId::LeftWrist, Point::new(100.0, 421.0))
        .with(JointId::RightWrist, Point::new(290.0, 418.0))
}

fn torso(y: f64) -> JointFrame {
    JointFrame::new()
        .with(JointId::Neck, Point::new(195.0, y))
        .with(JointId::LeftShoulder, Point::new(160.0, y + 4.0))
        .with(JointId::RightShoulder, Point::new(230.0, y - 4.0))
}

async fn send(controller: &WorkoutController, frame: JointFrame) {
    controller.push_frame(frame);
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn completed_workout_is_persisted_and_counts_toward_streak() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::open(dir.path()).unwrap();
    let controller = state
        .start_workout(Some(Goal::new(2).unwrap()), bar())
        .unwrap();

    // Idle until the wrists reach the bar.
    send(&controller, torso(500.0)).await;
    assert_eq!(controller.snapshot().status, TrackingStatus::Idle);
    assert!(!controller.snapshot().aligned);

    send(&controller, hanging()).await;
    let snapshot = controller.snapshot();
    assert!(snapshot.aligned);
    assert_eq!(snapshot.status, TrackingStatus::CountingDown);
    assert_eq!(snapshot.countdown, Some(3));

    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert_eq!(controller.snapshot().status, TrackingStatus::Tracking);

    for y in [500.0, 470.0, 430.0, 425.0, 480.0, 540.0] {
        send(&controller, torso(y)).await;
    }
    assert_eq!(controller.snapshot().rep_count, 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    for y in [520.0, 430.0, 470.0, 520.0] {
        send(&controller, torso(y)).await;
    }

    let record = controller.wait().await.unwrap().unwrap();
    assert_eq!(record.reps_completed, 2);
    assert_eq!(record.time_taken, 4);
    assert!(record.goal_met());
    drop(state);

    let reopened = AppState::open(dir.path()).unwrap();
    assert_eq!(reopened.store.sessions(), vec![record]);
    assert_eq!(reopened.store.calculate_streak(), 1);
}

#[tokio::test(start_paused = true)]
async fn default_goal_comes_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::open(dir.path()).unwrap();
    state.settings.set_default_goal(Goal::new(3).unwrap()).unwrap();

    let controller = state.start_workout(None, bar()).unwrap();
    assert_eq!(controller.snapshot().goal, 3);

    // Ending before the countdown still leaves a zero-rep entry.
    let record = controller.stop().await.unwrap().unwrap();
    assert_eq!(record.goal, 3);
    assert_eq!(record.reps_completed, 0);
    assert!(!record.goal_met());
    assert_eq!(state.store.sessions(), vec![record]);
    assert_eq!(state.store.calculate_streak(), 0);
}
