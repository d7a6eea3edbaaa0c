//! Budget tracker (spec.md §4.8): running per-month USD totals from a
//! fixed token price sheet, with automatic month rollover.

use chrono::{DateTime, Datelike, Utc};

/// USD per token, applied to the external-model client's reported
/// usage. Approximate Claude-class pricing; a fixed sheet per §4.8
/// ("input/output tokens -> USD using a fixed price sheet").
const INPUT_PRICE_PER_TOKEN: f64 = 0.000_003;
const OUTPUT_PRICE_PER_TOKEN: f64 = 0.000_015;
const CACHED_INPUT_PRICE_PER_TOKEN: f64 = 0.000_000_3;

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_input_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct BudgetTracker {
    year: i32,
    month: u32,
    spent_usd: f64,
}

impl BudgetTracker {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { year: now.year(), month: now.month(), spent_usd: 0.0 }
    }

    /// Record usage, converting to USD via the fixed price sheet.
    /// Resets the running total automatically on month rollover.
    pub fn record_usage(&mut self, usage: Usage, now: DateTime<Utc>) {
        self.roll_over_if_needed(now);
        self.spent_usd += usage.input_tokens as f64 * INPUT_PRICE_PER_TOKEN
            + usage.output_tokens as f64 * OUTPUT_PRICE_PER_TOKEN
            + usage.cached_input_tokens as f64 * CACHED_INPUT_PRICE_PER_TOKEN;
    }

    #[must_use]
    pub fn spent_usd(&self, now: DateTime<Utc>) -> f64 {
        if now.year() == self.year && now.month() == self.month {
            self.spent_usd
        } else {
            0.0
        }
    }

    /// `within_budget?(limit)`: true iff the running USD total for the
    /// current month is strictly less than `limit`.
    #[must_use]
    pub fn within_budget(&self, limit: f64, now: DateTime<Utc>) -> bool {
        self.spent_usd(now) < limit
    }

    fn roll_over_if_needed(&mut self, now: DateTime<Utc>) {
        if now.year() != self.year || now.month() != self.month {
            self.year = now.year();
            self.month = now.month();
            self.spent_usd = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn usage_accumulates_within_the_month() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut tracker = BudgetTracker::new(now);
        tracker.record_usage(Usage { input_tokens: 1_000_000, output_tokens: 0, cached_input_tokens: 0 }, now);
        assert!((tracker.spent_usd(now) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn month_rollover_resets_total() {
        let july = Utc.with_ymd_and_hms(2026, 7, 30, 0, 0, 0).unwrap();
        let mut tracker = BudgetTracker::new(july);
        tracker.record_usage(Usage { input_tokens: 1_000_000, output_tokens: 0, cached_input_tokens: 0 }, july);
        let august = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        assert!((tracker.spent_usd(august)).abs() < 1e-9);
    }

    #[test]
    fn within_budget_respects_limit() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut tracker = BudgetTracker::new(now);
        assert!(tracker.within_budget(1.0, now));
        tracker.record_usage(Usage { input_tokens: 1_000_000, output_tokens: 0, cached_input_tokens: 0 }, now);
        assert!(!tracker.within_budget(1.0, now));
    }
}
