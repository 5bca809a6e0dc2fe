//! Two-segment charge-time model
//!
//! Up to 96% the car gains roughly ten points an hour. Above 96% each four
//! points cost another 45 minutes on top.

/// Level where the slow final stretch begins
pub const TAPER_LEVEL: i64 = 96;

/// Seconds per percentage point below [`TAPER_LEVEL`]
pub const BULK_SECS_PER_POINT: i64 = 6 * 60 * 60 / 10;

/// Seconds per percentage point above [`TAPER_LEVEL`]
pub const TAPER_SECS_PER_POINT: i64 = 45 * 60 / 4;

pub const MIN_LEVEL: i64 = 50;
pub const MAX_LEVEL: i64 = 100;

/// Seconds of charging needed to bring `usable` up to `target`.
///
/// Negative when no charging is needed.
pub fn calculate_delta_s(target: i64, usable: i64) -> i64 {
    if usable >= target {
        return target
            .saturating_sub(usable)
            .saturating_mul(BULK_SECS_PER_POINT)
            .saturating_sub(1);
    }
    let bulk = target
        .min(TAPER_LEVEL)
        .saturating_sub(usable)
        .max(0)
        .saturating_mul(BULK_SECS_PER_POINT);
    let taper = (target - usable.max(TAPER_LEVEL)).max(0) * TAPER_SECS_PER_POINT;
    bulk.saturating_add(taper)
}

/// Target used when a request names no level: five points above the current
/// limit, but 80 for limits of 75 or less
pub fn default_target_level(current_limit: i64) -> i64 {
    if current_limit <= 75 {
        80
    } else {
        clamp_level(current_limit + 5)
    }
}

pub fn clamp_level(level: i64) -> i64 {
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}
