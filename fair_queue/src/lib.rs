//! Per-shard fair dispatch over a shared, rate-limited resource.
//!
//! A `FairQueue` arbitrates a single shard's access to a [`fair_group::FairGroup`]
//! across any number of priority classes, using a deficit-style virtual-time
//! cursor per class: the class with the smallest `accumulated` cost-per-share
//! dispatches next. Classes drop out of contention the instant their queue
//! empties and rejoin, rebased against the fairness window `tau`, the moment
//! new work arrives.

mod class;
mod config;
mod counters;
mod entry;
mod error;
mod heap;

pub use config::FairQueueConfig;
pub use counters::FairQueueCounters;
pub use entry::{Entry, EntryId};
pub use error::FairQueueError;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use class::PriorityClass;
use fair_group::FairGroup;
use heap::ClassHeap;
use ticket::{Capacity, Ticket};

/// Caller-chosen identifier for a priority class. Used directly as a sparse
/// array index, so callers should keep ids small and dense (0, 1, 2, ...).
pub type ClassId = u32;

struct Pending {
    head: Capacity,
    ticket: Ticket,
}

/// A single shard's fair dispatcher over one [`FairGroup`].
pub struct FairQueue<T> {
    group: Arc<FairGroup>,
    config: FairQueueConfig,
    counters: FairQueueCounters,

    classes: Vec<Option<PriorityClass<T>>>,
    heap: ClassHeap,
    next_entry_id: u64,

    /// High-water mark of `accumulated` across all classes that have ever
    /// been resident, used to rebase classes returning from idle.
    last_accumulated: f64,
    /// A capacity reservation blocked on a previous `dispatch_requests` call
    /// that has not yet cleared.
    pending: Option<Pending>,

    resources_executing: Ticket,
    resources_queued: Ticket,
    requests_executing: u64,
    requests_queued: u64,
}

impl<T> FairQueue<T> {
    pub fn new(group: Arc<FairGroup>, config: FairQueueConfig) -> Self {
        Self {
            group,
            config,
            counters: FairQueueCounters::default(),
            classes: Vec::new(),
            heap: ClassHeap::default(),
            next_entry_id: 0,
            last_accumulated: 0.0,
            pending: None,
            resources_executing: Ticket::default(),
            resources_queued: Ticket::default(),
            requests_executing: 0,
            requests_queued: 0,
        }
    }

    pub fn counters(&self) -> &FairQueueCounters {
        &self.counters
    }

    /// Number of priority classes currently resident in the dispatch heap.
    pub fn waiters(&self) -> usize {
        self.heap.len()
    }

    pub fn requests_currently_executing(&self) -> u64 {
        self.requests_executing
    }

    pub fn requests_currently_queued(&self) -> u64 {
        self.requests_queued
    }

    pub fn resources_currently_executing(&self) -> Ticket {
        self.resources_executing
    }

    pub fn resources_currently_queued(&self) -> Ticket {
        self.resources_queued
    }

    #[tracing::instrument(skip(self), fields(class_id, shares))]
    pub fn register_priority_class(
        &mut self,
        class_id: ClassId,
        shares: u32,
    ) -> Result<(), FairQueueError> {
        let idx = class_id as usize;
        if idx >= self.classes.len() {
            self.classes.resize_with(idx + 1, || None);
        }
        if self.classes[idx].is_some() {
            return Err(FairQueueError::ClassAlreadyRegistered(class_id));
        }
        self.classes[idx] = Some(PriorityClass::new(shares));
        tracing::debug!(class_id, shares, "priority class registered");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(class_id))]
    pub fn unregister_priority_class(&mut self, class_id: ClassId) -> Result<(), FairQueueError> {
        let class = self.class(class_id)?;
        if !class.queue.is_empty() {
            return Err(FairQueueError::ClassNotEmpty(class_id));
        }
        self.classes[class_id as usize] = None;
        tracing::debug!(class_id, "priority class unregistered");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(class_id, shares))]
    pub fn update_shares_for_class(
        &mut self,
        class_id: ClassId,
        shares: u32,
    ) -> Result<(), FairQueueError> {
        let class = self.class_mut(class_id)?;
        class.shares = shares.max(1);
        tracing::debug!(class_id, shares = class.shares, "priority class shares updated");
        Ok(())
    }

    /// Enqueues a new request under `class_id`. Returns the entry's stable id.
    pub fn queue(
        &mut self,
        class_id: ClassId,
        ticket: Ticket,
        payload: T,
    ) -> Result<EntryId, FairQueueError> {
        let entry_id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;

        let was_idle = {
            let class = self.class_mut(class_id)?;
            let was_idle = class.queue.is_empty() && !class.queued;
            class.queue.push_back(Entry {
                id: entry_id,
                ticket,
                payload,
            });
            was_idle
        };

        self.resources_queued = self.resources_queued + ticket;
        self.requests_queued += 1;

        if was_idle {
            self.rejoin_from_idle(class_id);
        }

        Ok(entry_id)
    }

    /// Marks `ticket`'s worth of resources as no longer executing and
    /// releases the matching capacity back to the group.
    pub fn notify_request_finished(&mut self, ticket: Ticket) {
        self.resources_executing = self.resources_executing.saturating_sub(ticket);
        self.requests_executing = self.requests_executing.saturating_sub(1);
        self.group.release_capacity(self.group.ticket_capacity(ticket));
    }

    /// Zeroes the ticket of the still-queued entry `entry_id` under
    /// `class_id`, so it costs nothing when `dispatch_requests` eventually
    /// reaches it. The entry is not unlinked: it keeps its slot in the
    /// class's FIFO and is still delivered to the sink, which is expected
    /// to recognize [`Entry::is_cancelled`] and skip real work.
    ///
    /// A no-op if the entry has already been dispatched or does not exist
    /// (both are treated as "already past the point cancellation matters").
    pub fn notify_request_cancelled(&mut self, class_id: ClassId, entry_id: EntryId) {
        let Ok(class) = self.class_mut(class_id) else {
            return;
        };
        let Some(entry) = class.queue.iter_mut().find(|e| e.id == entry_id) else {
            return;
        };
        if !entry.ticket.is_truthy() {
            return;
        }
        let ticket = entry.ticket;
        entry.ticket = Ticket::default();
        self.resources_queued = self.resources_queued.saturating_sub(ticket);
        self.counters.cancelled_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Drains resident classes in virtual-time order, calling `sink` once
    /// per dispatched entry, until either capacity is exhausted, this call's
    /// share of `max_capacity_per_dispatch` is spent, or no class has work
    /// left.
    #[tracing::instrument(skip(self, sink))]
    pub fn dispatch_requests(&mut self, mut sink: impl FnMut(&mut Entry<T>)) {
        let cap_per_call = self.config.capacity_per_dispatch_call();
        let mut dispatched_capacity: u64 = 0;

        loop {
            let Some(class_id) = self.heap.peek() else {
                break;
            };

            if self.front_ticket(class_id).is_none() {
                // Emptied since it was pushed (shouldn't normally happen —
                // classes leave the heap the moment their queue drains —
                // but dequeuing defensively keeps the heap's invariant
                // honest if a future caller adds an out-of-band drain).
                self.heap.pop(|id| self.key_of(id));
                if let Some(c) = self.classes[class_id as usize].as_mut() {
                    c.queued = false;
                }
                continue;
            }

            let front_ticket = self.front_ticket(class_id).unwrap();
            if !self.try_grab(front_ticket) {
                break;
            }

            self.heap.pop(|id| self.key_of(id));

            let class = self.classes[class_id as usize].as_mut().unwrap();
            let mut entry = class.queue.pop_front().unwrap();
            let shares = class.shares;

            self.last_accumulated = self.last_accumulated.max(class.accumulated);

            self.resources_executing = self.resources_executing + entry.ticket;
            self.resources_queued = self.resources_queued.saturating_sub(entry.ticket);
            self.requests_executing += 1;
            self.requests_queued = self.requests_queued.saturating_sub(1);

            let req_cost = entry.ticket.normalize(self.group.shares_capacity()) / shares as f64;
            self.advance_accumulated(class_id, req_cost);

            let class = self.classes[class_id as usize].as_mut().unwrap();
            if class.queue.is_empty() {
                class.queued = false;
            } else {
                class.queued = true;
                self.heap.push(class_id, |id| self.key_of(id));
            }

            let cap = self.group.ticket_capacity(entry.ticket);
            dispatched_capacity += cap;
            self.counters.dispatched_total.fetch_add(1, Ordering::Relaxed);

            tracing::debug!(class_id, entry_id = %entry.id, cap, "dispatched entry");
            sink(&mut entry);

            if dispatched_capacity >= cap_per_call {
                break;
            }
        }
    }

    fn front_ticket(&self, class_id: ClassId) -> Option<Ticket> {
        self.classes[class_id as usize]
            .as_ref()
            .and_then(|c| c.queue.front())
            .map(|e| e.ticket)
    }

    fn key_of(&self, class_id: ClassId) -> f64 {
        self.classes[class_id as usize]
            .as_ref()
            .map(|c| c.accumulated)
            .unwrap_or(f64::INFINITY)
    }

    /// Resolves capacity for `ticket`, consulting and updating `self.pending`
    /// per the reservation protocol. Returns `true` iff `ticket` is granted
    /// on this call.
    fn try_grab(&mut self, ticket: Ticket) -> bool {
        match self.pending.take() {
            None => self.fresh_grab(ticket),
            Some(p) => {
                if self.group.capacity_deficiency(p.head) > 0 {
                    self.pending = Some(p);
                    false
                } else if p.ticket == ticket {
                    // The reservation matured and still matches the entry
                    // it was taken for: consume it, no fresh grab needed.
                    true
                } else {
                    // Capacity cleared but the top class changed since the
                    // reservation was made (e.g. a different class floated
                    // to the top of the heap before this reservation
                    // matured). The old reservation's capacity was granted
                    // but will never be consumed by anything, so release it
                    // back to the group before grabbing fresh capacity for
                    // the entry actually at the front now.
                    self.group.release_capacity(self.group.ticket_capacity(p.ticket));
                    self.fresh_grab(ticket)
                }
            }
        }
    }

    fn fresh_grab(&mut self, ticket: Ticket) -> bool {
        let cap = self.group.ticket_capacity(ticket);
        let prior = self.group.grab_capacity(cap);
        let want_head = prior + cap;
        if self.group.capacity_deficiency(want_head) == 0 {
            true
        } else {
            self.pending = Some(Pending {
                head: want_head,
                ticket,
            });
            self.counters.capacity_denied_total.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    fn advance_accumulated(&mut self, class_id: ClassId, req_cost: f64) {
        let class = self.classes[class_id as usize].as_mut().unwrap();
        let candidate = class.accumulated + req_cost;
        if candidate.is_finite() {
            class.accumulated = candidate;
            return;
        }

        let pivot = class.accumulated;
        self.runaway_reset(pivot);
        let class = self.classes[class_id as usize].as_mut().unwrap();
        class.accumulated += req_cost;
    }

    /// Rebases every class's cursor so the scheduler can keep operating in
    /// `f64` without ever accumulating a non-finite value. Classes with
    /// pending work have `pivot` subtracted (preserving their relative
    /// order, since the same constant is subtracted from all of them);
    /// idle classes reset to zero, matching a class that just rejoined.
    fn runaway_reset(&mut self, pivot: f64) {
        for slot in self.classes.iter_mut() {
            if let Some(class) = slot {
                if class.queue.is_empty() && !class.queued {
                    class.accumulated = 0.0;
                } else {
                    class.accumulated -= pivot;
                }
            }
        }
        self.last_accumulated = 0.0;
        self.counters.runaway_resets_total.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(pivot, "runaway reset: rebased all priority class cursors");
    }

    /// Rebases a class coming back from idle against the current high-water
    /// mark, allowing it to return no more than `max_deviation` behind the
    /// fastest-advancing resident class, then admits it into the heap.
    fn rejoin_from_idle(&mut self, class_id: ClassId) {
        let max_deviation = self.max_deviation(class_id);
        let class = self.classes[class_id as usize].as_mut().unwrap();
        class.accumulated = class.accumulated.max(self.last_accumulated - max_deviation);
        class.queued = true;
        self.heap.push(class_id, |id| self.key_of(id));
        tracing::debug!(
            class_id,
            accumulated = class.accumulated,
            "priority class rejoined from idle"
        );
    }

    fn max_deviation(&self, class_id: ClassId) -> f64 {
        let shares = self.classes[class_id as usize].as_ref().unwrap().shares;
        let tau_ticks = self.config.tau_secs * self.group.rate_resolution_hz();
        self.group
            .cost_capacity()
            .normalize(self.group.shares_capacity())
            / shares as f64
            * tau_ticks
    }

    fn class(&self, class_id: ClassId) -> Result<&PriorityClass<T>, FairQueueError> {
        self.classes
            .get(class_id as usize)
            .and_then(|s| s.as_ref())
            .ok_or(FairQueueError::ClassNotRegistered(class_id))
    }

    fn class_mut(&mut self, class_id: ClassId) -> Result<&mut PriorityClass<T>, FairQueueError> {
        self.classes
            .get_mut(class_id as usize)
            .and_then(|s| s.as_mut())
            .ok_or(FairQueueError::ClassNotRegistered(class_id))
    }
}
