/// Configuration knobs for a [`crate::FairQueue`].
///
/// Mirrors [`fair_group::FairGroupConfig`]'s `Default`/`from_env()` shape.
#[derive(Clone, Debug)]
pub struct FairQueueConfig {
    /// Width, in seconds, of the idle-return fairness window. A class that
    /// has been idle is allowed to return at most `tau` behind the
    /// fastest-advancing resident class instead of all the way at zero,
    /// bounding how much it can out-compete already-queued work.
    pub tau_secs: f64,

    /// Number of shards sharing the owning [`fair_group::FairGroup`]. Used
    /// only to divide `max_capacity_per_dispatch` fairly across shards; it
    /// does not change how capacity itself is accounted.
    pub shard_count: u32,

    /// Upper bound, in fixed-point capacity units, on how much a single
    /// `dispatch_requests` call may hand out in total across all shards.
    /// Each shard's share is `max_capacity_per_dispatch / shard_count`.
    pub max_capacity_per_dispatch: u64,
}

impl Default for FairQueueConfig {
    fn default() -> Self {
        Self {
            tau_secs: 0.5,
            shard_count: 1,
            max_capacity_per_dispatch: 1 << 20,
        }
    }
}

impl FairQueueConfig {
    /// Overlay environment variables onto [`Default`]. Any variable that is
    /// unset or fails to parse falls back to its default, the same
    /// tolerant style as `AppConfig::from_env`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            tau_secs: env_parse("FAIR_QUEUE_TAU_SECS", d.tau_secs),
            shard_count: env_parse("FAIR_QUEUE_SHARD_COUNT", d.shard_count).max(1),
            max_capacity_per_dispatch: env_parse(
                "FAIR_QUEUE_MAX_CAPACITY_PER_DISPATCH",
                d.max_capacity_per_dispatch,
            ),
        }
    }

    /// This shard's slice of `max_capacity_per_dispatch`.
    pub fn capacity_per_dispatch_call(&self) -> u64 {
        self.max_capacity_per_dispatch / self.shard_count.max(1) as u64
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
