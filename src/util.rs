//! This is an internal module that contains integer helpers used by other modules.

/// Integer division, rounded to the nearest value. Halves round up.
pub(crate) const fn div_round(num: u64, denom: u64) -> u64 {
    (num + denom / 2) / denom
}

/// `|a - b|` without going through signed types.
pub(crate) const fn abs_diff(a: u64, b: u64) -> u64 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
