use std::time::Duration;

pub const DEFAULT_CHECK_INTERVAL_MINUTES: u32 = 60;

/// Turns a raw interval into whole minutes. Non-finite input falls back to
/// `fallback`; anything that floors to zero or below disables checking.
pub fn normalize_interval_minutes(raw: f64, fallback: u32) -> u32 {
    if !raw.is_finite() {
        return fallback;
    }
    if raw < 1.0 {
        return 0;
    }
    raw.floor().min(f64::from(u32::MAX)) as u32
}

/// Timer period for a check interval, or `None` when checking is disabled.
pub fn timer_period(interval_minutes: u32) -> Option<Duration> {
    if interval_minutes == 0 {
        return None;
    }
    Some(Duration::from_secs(u64::from(interval_minutes.max(1)) * 60))
}
