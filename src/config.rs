use std::time::Duration;

/// Runtime tuning knobs. The distance thresholds and tick counts are
/// empirically chosen defaults, kept overridable per deployment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Shuttle fixes older than this are dropped from the live set.
    pub fix_ttl: Duration,

    // Path projector
    pub acceptance_distance_m: f64,
    pub search_ahead_segments: usize,

    // Progress tracker
    pub min_advance_m: f64,
    pub max_backward_m: f64,

    // Boarding state machine
    pub near_threshold_m: f64,
    pub far_threshold_m: f64,
    pub min_movement_m: f64,
    pub board_ticks: u32,
    pub alight_ticks: u32,
    pub stale_after: Duration,

    // Presentation helpers
    pub simplify_tolerance_deg: f64,
    pub marker_limit: usize,
    pub marker_padding_deg: f64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            max_upload_bytes: env_parse("MAX_UPLOAD_MB", 5usize) * 1024 * 1024,
            fix_ttl: Duration::from_secs(env_parse("FIX_TTL_SECONDS", 300)),
            acceptance_distance_m: env_parse("ACCEPTANCE_DISTANCE_M", 100.0),
            search_ahead_segments: env_parse("SEARCH_AHEAD_SEGMENTS", 15),
            min_advance_m: env_parse("MIN_ADVANCE_M", 2.0),
            max_backward_m: env_parse("MAX_BACKWARD_M", 5.0),
            near_threshold_m: env_parse("NEAR_THRESHOLD_M", 30.0),
            far_threshold_m: env_parse("FAR_THRESHOLD_M", 100.0),
            min_movement_m: env_parse("MIN_MOVEMENT_M", 5.0),
            board_ticks: env_parse("BOARD_TICKS", 4),
            alight_ticks: env_parse("ALIGHT_TICKS", 4),
            stale_after: Duration::from_secs(env_parse("STALE_AFTER_SECS", 10)),
            simplify_tolerance_deg: env_parse("SIMPLIFY_TOLERANCE_DEG", 0.00003),
            marker_limit: env_parse("MARKER_LIMIT", 50),
            marker_padding_deg: env_parse("MARKER_PADDING_DEG", 0.003),
        }
    }
}
