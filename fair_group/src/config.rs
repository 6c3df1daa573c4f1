use ticket::Ticket;

/// Configuration knobs for a [`crate::FairGroup`].
///
/// Mirrors `backend::config::AppConfig`'s `from_env()` convention: sane
/// defaults live on `Default`, and `from_env()` overlays whatever the
/// process environment sets, falling back to the default on any parse
/// failure or missing variable.
#[derive(Clone, Debug)]
pub struct FairGroupConfig {
    /// Component of `shares_capacity`: max simultaneous in-flight operations.
    pub max_weight: u32,
    /// Component of `shares_capacity`: max simultaneous in-flight bytes.
    pub max_size: u32,

    /// Per-second operation-count rate component of `cost_capacity`.
    pub weight_rate: f64,
    /// Per-second byte-volume rate component of `cost_capacity`.
    pub size_rate: f64,

    /// How many rate-resolution ticks make up one second. `cost_capacity`'s
    /// rate components are `weight_rate / rate_resolution_hz` and
    /// `size_rate / rate_resolution_hz`.
    pub rate_resolution_hz: f64,

    /// Multiplied by `FIXED_POINT_FACTOR` to yield `replenish_rate`
    /// (fixed-point capacity units issued per rate-resolution tick).
    pub rate_factor: f64,

    /// Multiplied by `replenish_rate` to yield `replenish_limit`, the
    /// burst ceiling retained between replenishments.
    pub rate_limit_duration_secs: f64,

    /// Minimum `extra` (in fixed-point capacity units) a replenishment must
    /// accumulate before it is worth a CAS attempt. Must be at least 1.
    pub replenish_threshold: u64,
}

impl Default for FairGroupConfig {
    fn default() -> Self {
        Self {
            max_weight: 1000,
            max_size: 1 << 20,
            weight_rate: 100.0,
            size_rate: (64 << 10) as f64,
            rate_resolution_hz: 2_000.0, // ~500 microsecond ticks
            rate_factor: 1.0,
            rate_limit_duration_secs: 1.0,
            replenish_threshold: 1,
        }
    }
}

impl FairGroupConfig {
    /// Overlay environment variables onto [`Default`]. Any variable that is
    /// unset or fails to parse falls back to its default, the same
    /// tolerant style as `AppConfig::from_env`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_weight: env_parse("FAIR_GROUP_MAX_WEIGHT", d.max_weight),
            max_size: env_parse("FAIR_GROUP_MAX_SIZE", d.max_size),
            weight_rate: env_parse("FAIR_GROUP_WEIGHT_RATE", d.weight_rate),
            size_rate: env_parse("FAIR_GROUP_SIZE_RATE", d.size_rate),
            rate_resolution_hz: env_parse("FAIR_GROUP_RATE_RESOLUTION_HZ", d.rate_resolution_hz),
            rate_factor: env_parse("FAIR_GROUP_RATE_FACTOR", d.rate_factor),
            rate_limit_duration_secs: env_parse(
                "FAIR_GROUP_RATE_LIMIT_DURATION_SECS",
                d.rate_limit_duration_secs,
            ),
            replenish_threshold: env_parse("FAIR_GROUP_REPLENISH_THRESHOLD", d.replenish_threshold)
                .max(1),
        }
    }

    pub fn shares_capacity(&self) -> Ticket {
        Ticket::new(self.max_weight, self.max_size)
    }

    pub fn cost_capacity(&self) -> Ticket {
        Ticket::new(
            (self.weight_rate / self.rate_resolution_hz).round() as u32,
            (self.size_rate / self.rate_resolution_hz).round() as u32,
        )
    }

    pub fn replenish_rate(&self) -> u64 {
        (self.rate_factor * ticket::FIXED_POINT_FACTOR).round() as u64
    }

    pub fn replenish_limit(&self) -> u64 {
        let rate_per_sec = self.replenish_rate() as f64 * self.rate_resolution_hz;
        (rate_per_sec * self.rate_limit_duration_secs).round() as u64
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
