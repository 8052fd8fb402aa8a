// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff schedule for failed tasks.

/// Delay before the next attempt of a task that has already failed
/// `attempts` times: `min(2^attempts * base, cap)`.
pub fn retry_delay_secs(attempts: i64, base_secs: u64, cap_secs: u64) -> u64 {
    // Past 32 doublings the cap has long since taken over.
    let exp = attempts.clamp(0, 32) as u32;
    let factor = 2u64.saturating_pow(exp);
    base_secs.saturating_mul(factor).min(cap_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base_until_cap() {
        assert_eq!(retry_delay_secs(0, 60, 600), 60);
        assert_eq!(retry_delay_secs(1, 60, 600), 120);
        assert_eq!(retry_delay_secs(2, 60, 600), 240);
        assert_eq!(retry_delay_secs(3, 60, 600), 480);
        assert_eq!(retry_delay_secs(4, 60, 600), 600);
        assert_eq!(retry_delay_secs(5, 60, 600), 600);
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        assert_eq!(retry_delay_secs(1_000_000, 60, 600), 600);
        assert_eq!(retry_delay_secs(63, u64::MAX, 600), 600);
    }

    #[test]
    fn negative_attempts_clamp_to_base() {
        assert_eq!(retry_delay_secs(-1, 60, 600), 60);
    }
}
