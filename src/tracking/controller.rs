use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{JointFrame, WorkoutSession},
    store::SessionStore,
};

use super::{
    frames::FrameSlot,
    state::{FrameOutcome, TickOutcome, TrackingSession, TrackingStatus, WorkoutSnapshot},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

enum ControlCommand {
    Stop,
}

enum LoopExit {
    Finished(WorkoutSession),
    Stopped(Option<WorkoutSession>),
    Cancelled,
}

type LoopHandle = JoinHandle<Result<Option<WorkoutSession>>>;

/// Drives one [`TrackingSession`] on a single task.
///
/// Frames, the one-second tick, and stop requests are all applied from that
/// task, so the session state is never touched concurrently. The frame
/// producer hands frames over through a [`FrameSlot`]; the UI reads
/// [`WorkoutSnapshot`]s from a watch channel.
#[derive(Clone)]
pub struct WorkoutController {
    frames: FrameSlot,
    snapshot_rx: watch::Receiver<WorkoutSnapshot>,
    commands: mpsc::Sender<ControlCommand>,
    cancel_token: CancellationToken,
    handle: Arc<Mutex<Option<LoopHandle>>>,
}

impl WorkoutController {
    /// Spawns the tracking loop. Must be called inside a tokio runtime.
    /// A session that has already ended cannot be driven again.
    pub fn start(
        session: TrackingSession,
        store: Arc<SessionStore>,
        tick_interval: Duration,
    ) -> Result<Self> {
        if session.status().is_terminal() {
            bail!(
                "cannot start a tracking loop for a {} session",
                session.status().as_str()
            );
        }

        let frames = FrameSlot::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot(now()));
        let (command_tx, command_rx) = mpsc::channel(4);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(tracking_loop(
            session,
            frames.clone(),
            store,
            snapshot_tx,
            command_rx,
            cancel_token.clone(),
            tick_interval,
        ));

        Ok(Self {
            frames,
            snapshot_rx,
            commands: command_tx,
            cancel_token,
            handle: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Producer-side handle. Pushing after the session ends is a no-op.
    pub fn frame_sink(&self) -> FrameSlot {
        self.frames.clone()
    }

    pub fn push_frame(&self, frame: JointFrame) -> bool {
        self.frames.push(frame)
    }

    pub fn snapshot(&self) -> WorkoutSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkoutSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Ends the workout. Returns the persisted record unless the session had
    /// already finished or been cancelled.
    pub async fn stop(&self) -> Result<Option<WorkoutSession>> {
        // The loop may already be gone after reaching the goal.
        let _ = self.commands.send(ControlCommand::Stop).await;
        self.wait().await
    }

    /// Abandons the workout without recording anything.
    pub async fn cancel(&self) -> Result<()> {
        self.cancel_token.cancel();
        self.wait().await.map(|_| ())
    }

    /// Waits for the loop to exit. Only the first caller receives the record.
    pub async fn wait(&self) -> Result<Option<WorkoutSession>> {
        let handle = self.handle.lock().await.take();
        match handle {
            Some(handle) => handle
                .await
                .context("tracking loop task failed to join")?,
            None => Ok(None),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_closed()
    }
}

/// Reads the runtime clock so a paused test clock drives the rep lock too.
fn now() -> std::time::Instant {
    time::Instant::now().into_std()
}

async fn tracking_loop(
    mut session: TrackingSession,
    frames: FrameSlot,
    store: Arc<SessionStore>,
    snapshot_tx: watch::Sender<WorkoutSnapshot>,
    mut commands: mpsc::Receiver<ControlCommand>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
) -> Result<Option<WorkoutSession>> {
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick one full interval from now rather than immediately.
    ticker.reset();

    let exit = loop {
        tokio::select! {
            _ = ticker.tick() => {
                match session.tick() {
                    TickOutcome::Countdown(n) => log_info!("Countdown {}", n),
                    TickOutcome::TrackingStarted => log_info!("Countdown finished, tracking"),
                    TickOutcome::Elapsed(secs) => log_debug!("Elapsed {}s", secs),
                    TickOutcome::None => {}
                }
            }
            _ = frames.notified() => {
                let Some(frame) = frames.take() else {
                    continue;
                };
                let was_idle = session.status() == TrackingStatus::Idle;
                match session.handle_frame(&frame, now()) {
                    FrameOutcome::Finished(record) => break LoopExit::Finished(record),
                    FrameOutcome::RepCounted(count) => log_debug!("Rep count now {}", count),
                    FrameOutcome::Updated | FrameOutcome::Ignored => {}
                }
                // The countdown runs on whole seconds from the moment of alignment.
                if was_idle && session.status() == TrackingStatus::CountingDown {
                    ticker.reset();
                }
            }
            command = commands.recv() => {
                match command {
                    Some(ControlCommand::Stop) => break LoopExit::Stopped(session.stop()),
                    // Every controller handle is gone; the workout was abandoned.
                    None => {
                        session.cancel();
                        break LoopExit::Cancelled;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                session.cancel();
                break LoopExit::Cancelled;
            }
        }

        snapshot_tx.send_replace(session.snapshot(now()));
    };

    // No more frames or ticks past this point.
    frames.close();
    drop(ticker);

    info!(
        "Tracking loop finished: {} reps, {}s, {} frames processed, {} overwritten, {} without torso",
        session.rep_count(),
        session.elapsed_secs(),
        frames.delivered(),
        frames.overwritten(),
        session.frames_skipped()
    );

    let record = match exit {
        LoopExit::Finished(record) => Some(record),
        LoopExit::Stopped(record) => record,
        LoopExit::Cancelled => {
            info!("Workout cancelled; nothing recorded");
            None
        }
    };

    snapshot_tx.send_replace(session.snapshot(now()));

    if let Some(record) = &record {
        let to_store = record.clone();
        let store = Arc::clone(&store);
        let persisted = tokio::task::spawn_blocking(move || store.add_session(to_store))
            .await
            .map_err(|err| anyhow!("history write task failed: {err}"))
            .and_then(|result| result);
        if let Err(err) = persisted {
            log_error!("Failed to persist session {}: {err:#}", record.id);
            return Err(err.context(format!("failed to persist session {}", record.id)));
        }
    }

    Ok(record)
}
