use crossbeam_queue::SegQueue;

/// Unbounded FIFO that moves values from one thread to another.
///
/// `push` never blocks and never fails; `pop` returns `None` straight away
/// when nothing is queued. Values pushed by a single producer come out in
/// the order they went in.
pub struct HandoffQueue<T> {
    inner: SegQueue<T>,
}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    #[inline]
    pub fn push(&self, item: T) {
        self.inner.push(item);
    }

    #[inline]
    pub fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
