//! Process-wide, cross-shard capacity accounting for a single rate-limited
//! resource.
//!
//! A `FairGroup` holds the shared, replenishable budget; any number of
//! shards (threads) grab capacity from it and release it back on
//! completion. The only synchronization is three atomic "rovers" plus a
//! single compare-exchange that elects one replenisher per tick — no mutex
//! is ever held across a `FairGroup` method.

mod config;

pub use config::FairGroupConfig;

use std::sync::atomic::{AtomicU64, Ordering};
use ticket::{wdiff, Capacity, Rover, Ticket};

/// Shared, replenishable capacity budget for one resource, consulted by
/// every shard's [`fair_queue::FairQueue`].
#[derive(Debug)]
pub struct FairGroup {
    shares_capacity: Ticket,
    cost_capacity: Ticket,
    replenish_rate: u64,
    replenish_limit: u64,
    replenish_threshold: u64,
    rate_resolution_hz: f64,

    capacity_tail: Rover,
    capacity_head: Rover,
    capacity_ceil: Rover,
    replenished: AtomicU64,
}

impl FairGroup {
    pub fn new(cfg: &FairGroupConfig) -> Self {
        let replenish_limit = cfg.replenish_limit();
        Self {
            shares_capacity: cfg.shares_capacity(),
            cost_capacity: cfg.cost_capacity(),
            replenish_rate: cfg.replenish_rate(),
            replenish_limit,
            replenish_threshold: cfg.replenish_threshold.max(1),
            rate_resolution_hz: cfg.rate_resolution_hz,
            capacity_tail: Rover::new(0),
            // `head` starts at the burst ceiling, not zero: a fresh group
            // must immediately grant up to `replenish_limit` worth of
            // capacity without waiting on a replenish tick.
            capacity_head: Rover::new(replenish_limit),
            // `ceil` tracks `tail + replenish_limit` (see `grab_capacity`),
            // so it starts level with `head`.
            capacity_ceil: Rover::new(replenish_limit),
            replenished: AtomicU64::new(0),
        }
    }

    pub fn shares_capacity(&self) -> Ticket {
        self.shares_capacity
    }

    pub fn cost_capacity(&self) -> Ticket {
        self.cost_capacity
    }

    /// How many rate-resolution ticks make up one second of wall-clock time.
    /// Used by `fair_queue` to convert the `tau` fairness window (seconds)
    /// into rover units.
    pub fn rate_resolution_hz(&self) -> f64 {
        self.rate_resolution_hz
    }

    /// Pure conversion from ticket to fixed-point capacity (see `ticket` crate).
    pub fn ticket_capacity(&self, t: Ticket) -> Capacity {
        ticket::ticket_capacity(t, self.cost_capacity)
    }

    /// Atomically advances `tail` by `cap`, returning the prior value. Also
    /// advances `ceil` by `cap` so the burst ceiling rides along with
    /// outstanding requested work (`ceil` stays `replenish_limit` ahead of
    /// `tail`, plus whatever `release_capacity` has added on top) — without
    /// this, `replenish_capacity` could never advance `head` past the
    /// initial burst once it was consumed, no matter how much work was
    /// queued behind it. Never fails, never blocks.
    pub fn grab_capacity(&self, cap: Capacity) -> Capacity {
        let prior = self.capacity_tail.fetch_add(cap, Ordering::Relaxed);
        self.capacity_ceil.fetch_add(cap, Ordering::Relaxed);
        prior
    }

    /// Atomically advances `ceil` by `cap`, raising the headroom available
    /// to future replenishment beyond what `grab_capacity` already grants.
    /// Called on request completion.
    pub fn release_capacity(&self, cap: Capacity) {
        self.capacity_ceil.fetch_add(cap, Ordering::Relaxed);
    }

    /// Returns `wdiff(x, head)`: how far past the currently granted
    /// frontier `x` lies. Zero means "granted."
    pub fn capacity_deficiency(&self, x: Capacity) -> Capacity {
        wdiff(x, self.capacity_head.load(Ordering::Relaxed))
    }

    /// Idempotent: advances `head` toward `tail` based on elapsed
    /// rate-resolution ticks since the last replenishment, bounded by
    /// `ceil`. `now` is a rate-resolution tick counter owned by the
    /// caller's periodic driver, not a wall-clock timestamp.
    pub fn replenish_capacity(&self, now: u64) {
        let ts = self.replenished.load(Ordering::Relaxed);
        if now <= ts {
            return;
        }

        let delta = now - ts;
        let extra = (self.replenish_rate as f64 * delta as f64).round() as u64;
        if extra < self.replenish_threshold {
            return;
        }

        // Elect a single replenisher per interval; losers return immediately.
        if self
            .replenished
            .compare_exchange(ts, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let head = self.capacity_head.load(Ordering::Relaxed);
        let ceil = self.capacity_ceil.load(Ordering::Relaxed);
        let headroom = wdiff(ceil, head);
        let advance = extra.min(headroom);
        if advance > 0 {
            self.capacity_head.fetch_add(advance, Ordering::Relaxed);
        }

        tracing::trace!(extra, headroom, advance, "replenished capacity");
    }

    /// Current `tail` rover value (diagnostics only).
    pub fn tail(&self) -> Capacity {
        self.capacity_tail.load(Ordering::Relaxed)
    }

    /// Current `head` rover value (diagnostics only).
    pub fn head(&self) -> Capacity {
        self.capacity_head.load(Ordering::Relaxed)
    }

    /// Current `ceil` rover value (diagnostics only).
    pub fn ceil(&self) -> Capacity {
        self.capacity_ceil.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_with_limit(rate: f64, limit_secs: f64) -> FairGroup {
        let cfg = FairGroupConfig {
            rate_factor: rate / ticket::FIXED_POINT_FACTOR,
            rate_limit_duration_secs: limit_secs,
            rate_resolution_hz: 1.0,
            ..FairGroupConfig::default()
        };
        FairGroup::new(&cfg)
    }

    #[test]
    fn grab_capacity_returns_prior_tail() {
        let g = group_with_limit(10.0, 10.0);
        assert_eq!(g.grab_capacity(5), 0);
        assert_eq!(g.grab_capacity(3), 5);
        assert_eq!(g.tail(), 8);
    }

    #[test]
    fn fresh_group_grants_up_to_burst_ceiling() {
        let g = group_with_limit(10.0, 10.0); // replenish_limit = 100
        assert_eq!(g.capacity_deficiency(50), 0);
        assert_eq!(g.capacity_deficiency(100), 0);
        assert_eq!(g.capacity_deficiency(101), 1);
    }

    #[test]
    fn replenish_is_noop_when_now_does_not_advance() {
        let g = group_with_limit(10.0, 1.0);
        g.replenish_capacity(5);
        let head_before = g.head();
        g.replenish_capacity(5);
        g.replenish_capacity(0);
        assert_eq!(g.head(), head_before);
    }

    #[test]
    fn replenish_advances_head_toward_tail_bounded_by_ceil() {
        // rate=10/tick, limit=10 ticks worth => head/ceil start at 100.
        let g = group_with_limit(10.0, 10.0);
        let head0 = g.head();
        g.grab_capacity(1000); // plenty outstanding; also lifts ceil by 1000
        g.replenish_capacity(1);
        assert_eq!(g.head(), head0 + 10);
        g.replenish_capacity(2);
        assert_eq!(g.head(), head0 + 20);
    }

    #[test]
    fn replenish_never_exceeds_headroom() {
        let g = group_with_limit(1000.0, 1.0); // head/ceil start at 1000
        g.grab_capacity(50); // ceil becomes 1050; only 50 of headroom opens up
        g.replenish_capacity(10); // would be 10_000 without the ceil clamp
        assert_eq!(g.head(), 1050);
    }

    #[test]
    fn release_capacity_raises_ceil_and_therefore_headroom() {
        let g = group_with_limit(10.0, 1.0); // ceil = 10
        g.release_capacity(90);
        assert_eq!(g.ceil(), 100);
    }

    #[test]
    fn capacity_reservation_protocol_end_to_end() {
        let g = group_with_limit(10.0, 1.0); // head = ceil = 10
        let cap = 4;
        let prior = g.grab_capacity(cap);
        let want_head = prior + cap;
        // Immediately grantable: well within the initial burst ceiling.
        assert_eq!(g.capacity_deficiency(want_head), 0);

        // Exhaust the burst allowance with a second, larger grab.
        let prior2 = g.grab_capacity(20);
        let want_head2 = prior2 + 20;
        assert!(g.capacity_deficiency(want_head2) > 0);

        g.replenish_capacity(1); // head advances by 10
        assert!(g.capacity_deficiency(want_head2) > 0);
        g.replenish_capacity(2);
        assert_eq!(g.capacity_deficiency(want_head2), 0);
    }

    #[test]
    fn capacity_once_grabbed_is_never_ungrabbed() {
        let g = group_with_limit(10.0, 1.0);
        g.grab_capacity(5);
        let tail_before = g.tail();
        // release_capacity only ever raises ceil, never touches tail.
        g.release_capacity(1000);
        assert_eq!(g.tail(), tail_before);
    }
}
