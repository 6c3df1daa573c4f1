//! Shared helpers for `fair_queue` integration tests.

use std::sync::Arc;

use fair_group::{FairGroup, FairGroupConfig};
use fair_queue::{FairQueue, FairQueueConfig};

/// Builds a group with an effectively unlimited burst ceiling and a fixed
/// replenishment rate, paired with a queue whose fairness window is `tau`.
pub fn unthrottled_queue<T>(tau_secs: f64) -> FairQueue<T> {
    let group_cfg = FairGroupConfig {
        rate_factor: 1e9 / ticket::FIXED_POINT_FACTOR,
        rate_limit_duration_secs: 1e9,
        rate_resolution_hz: 1.0,
        ..FairGroupConfig::default()
    };
    let group = Arc::new(FairGroup::new(&group_cfg));
    let cfg = FairQueueConfig {
        tau_secs,
        shard_count: 1,
        max_capacity_per_dispatch: u64::MAX,
    };
    FairQueue::new(group, cfg)
}

/// Builds a throttled group: `rate` capacity units per tick, with
/// `limit_secs` worth of burst headroom. Pairs with `FairGroup::replenish_capacity`
/// driven explicitly by the caller's own tick counter.
///
/// `weight_rate`/`size_rate` are pinned to `FIXED_POINT_FACTOR` so that
/// `ticket_capacity(Ticket::new(w, s))` comes out as `w + s` fixed-point
/// units — the same scale `rate` and `limit_secs` are expressed in above.
/// Leaving them at their defaults (tuned for realistic byte/weight ranges)
/// would price a unit ticket at 10_000+ capacity units against a group
/// throttled to single digits per tick, so nothing would ever drain.
pub fn throttled_group(rate: f64, limit_secs: f64) -> Arc<FairGroup> {
    let cfg = FairGroupConfig {
        rate_factor: rate / ticket::FIXED_POINT_FACTOR,
        rate_limit_duration_secs: limit_secs,
        rate_resolution_hz: 1.0,
        weight_rate: ticket::FIXED_POINT_FACTOR,
        size_rate: ticket::FIXED_POINT_FACTOR,
        ..FairGroupConfig::default()
    };
    Arc::new(FairGroup::new(&cfg))
}
