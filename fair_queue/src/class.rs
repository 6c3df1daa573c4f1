use std::collections::VecDeque;

use crate::entry::Entry;

/// Per-class state: its fair-share weight, its virtual-time cursor, and its
/// FIFO of waiting entries.
///
/// `queue` is a plain `VecDeque` rather than an intrusive list — entries own
/// their position by index, not by embedded link pointers, which keeps the
/// whole crate free of unsafe code at the cost of one extra allocation per
/// class instead of per-entry linking.
#[derive(Debug)]
pub(crate) struct PriorityClass<T> {
    pub shares: u32,
    pub accumulated: f64,
    pub queue: VecDeque<Entry<T>>,
    /// True while this class sits in the dispatch heap. A class is resident
    /// (`queued == true`) iff its queue is non-empty; the flag exists so
    /// callers that just emptied a queue can tell apart "about to be popped
    /// from the heap" from "already absent."
    pub queued: bool,
}

impl<T> PriorityClass<T> {
    pub fn new(shares: u32) -> Self {
        Self {
            shares: shares.max(1),
            accumulated: 0.0,
            queue: VecDeque::new(),
            queued: false,
        }
    }
}
