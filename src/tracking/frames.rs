//! Hand-off between the pose producer and the tracking loop.
//!
//! The producer never queues: `FrameSlot` holds at most one pending frame and
//! a newer frame replaces an unconsumed one. `InferenceGate` keeps at most one
//! inference in flight on the producer side.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use tokio::sync::Notify;

use crate::models::JointFrame;

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<JointFrame>,
    closed: bool,
}

#[derive(Debug, Default)]
struct SlotInner {
    state: Mutex<SlotState>,
    notify: Notify,
    delivered: AtomicU64,
    overwritten: AtomicU64,
}

/// Capacity-1 mailbox with overwrite semantics. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct FrameSlot {
    inner: Arc<SlotInner>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Offers a frame. Returns `false` once the slot is closed.
    pub fn push(&self, frame: JointFrame) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            if state.pending.replace(frame).is_some() {
                self.inner.overwritten.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.inner.notify.notify_one();
        true
    }

    /// Takes the pending frame, if any.
    pub fn take(&self) -> Option<JointFrame> {
        let frame = self.lock().pending.take();
        if frame.is_some() {
            self.inner.delivered.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    /// Waits until a frame may be pending. Spurious wake-ups are possible;
    /// follow with [`FrameSlot::take`].
    pub async fn notified(&self) {
        self.inner.notify.notified().await;
    }

    /// Rejects all further frames and discards a pending one.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.pending = None;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Frames replaced before the loop got to them.
    pub fn overwritten(&self) -> u64 {
        self.inner.overwritten.load(Ordering::Relaxed)
    }
}

/// Busy flag for the producer: a new camera frame is only sent for
/// inference when the previous one has finished.
#[derive(Debug, Clone, Default)]
pub struct InferenceGate {
    busy: Arc<AtomicBool>,
    skipped: Arc<AtomicU64>,
}

/// Held while one inference runs; releases the gate on drop.
#[derive(Debug)]
pub struct InferencePermit {
    busy: Arc<AtomicBool>,
}

impl Drop for InferencePermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl InferenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means an inference is already running and this frame is dropped.
    pub fn try_acquire(&self) -> Option<InferencePermit> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(InferencePermit {
                busy: Arc::clone(&self.busy),
            })
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
