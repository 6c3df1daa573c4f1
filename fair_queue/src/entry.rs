use ticket::Ticket;

/// Stable identity for a queued entry, assigned at `queue()` time and never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One request waiting in, or just popped from, a priority class's FIFO.
///
/// `payload` is whatever the caller needs to resume the request (a waker, a
/// channel sender, a boxed closure) — the queue never interprets it.
#[derive(Debug)]
pub struct Entry<T> {
    pub id: EntryId,
    pub ticket: Ticket,
    pub payload: T,
}

impl<T> Entry<T> {
    /// A cancelled entry carries a zeroed ticket: it still occupies its slot
    /// in the FIFO, but costs nothing when it is eventually dispatched.
    pub fn is_cancelled(&self) -> bool {
        !self.ticket.is_truthy()
    }
}
