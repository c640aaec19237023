use std::sync::Arc;

use pigeonlink_core::HandoffQueue;

use crate::frame::Frame;

/// The one object shared by the RX and TX linkmods.
///
/// Cloning hands out another reference to the same queue. Callers never
/// lock around `push`/`pop`.
#[derive(Clone, Default)]
pub struct FrameQueue {
    inner: Arc<HandoffQueue<Frame>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: Frame) {
        self.inner.push(frame);
    }

    /// Never blocks; `None` means nothing is queued right now.
    pub fn pop(&self) -> Option<Frame> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue").field("len", &self.len()).finish()
    }
}
