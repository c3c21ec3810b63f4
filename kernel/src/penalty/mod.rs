// Penalty Calculation
//
// Pure functions of loan dates and the configured daily rate.
// This module is deterministic and side-effect free.

use chrono::NaiveDate;

/// Days past the due date, clamped at zero.
pub fn days_late(today: NaiveDate, due_date: NaiveDate) -> i64 {
    today.signed_duration_since(due_date).num_days().max(0)
}

/// Monetary penalty for a late return.
///
/// Zero when not late; the rate comes from configuration, never a
/// per-call constant.
pub fn penalty(days_late: i64, rate_per_day: f64) -> f64 {
    if days_late <= 0 {
        return 0.0;
    }
    days_late as f64 * rate_per_day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn on_time_return_has_no_penalty() {
        let due = date(2025, 1, 31);
        assert_eq!(days_late(date(2025, 1, 31), due), 0);
        assert_eq!(days_late(date(2025, 1, 10), due), 0);
        assert_eq!(penalty(0, 0.5), 0.0);
    }

    #[test]
    fn late_return_accrues_per_day() {
        let due = date(2025, 1, 31);
        let late = days_late(date(2025, 2, 5), due);
        assert_eq!(late, 5);
        assert_eq!(penalty(late, 0.5), 2.5);
    }

    #[test]
    fn negative_days_never_produce_a_credit() {
        assert_eq!(penalty(-3, 0.5), 0.0);
    }
}
