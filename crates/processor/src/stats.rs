//! Running Statistics

use behavior_rules::BehaviorLabel;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Additive counters over the lifetime of the process
#[derive(Debug, Clone, Default)]
pub struct BehaviorStats {
    total_processed: u64,
    good_behavior: u64,
    bad_behavior: u64,
    active_vehicles: usize,
    dropped: u64,
}

impl BehaviorStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classified sample; returns the new processed total
    pub fn record(&mut self, label: BehaviorLabel) -> u64 {
        self.total_processed += 1;
        metrics::counter!("driving_behavior_processed_total").increment(1);

        match label {
            BehaviorLabel::Good => {
                self.good_behavior += 1;
                metrics::counter!("driving_behavior_good_total").increment(1);
            }
            BehaviorLabel::Bad => {
                self.bad_behavior += 1;
                metrics::counter!("driving_behavior_bad_total").increment(1);
            }
        }

        self.total_processed
    }

    /// Count one dropped message
    pub fn record_drop(&mut self, reason: &'static str) {
        self.dropped += 1;
        metrics::counter!("driving_behavior_dropped_total", "reason" => reason).increment(1);
    }

    /// Track the current state store size
    pub fn set_active_vehicles(&mut self, count: usize) {
        self.active_vehicles = count;
        metrics::gauge!("driving_behavior_active_vehicles").set(count as f64);
    }

    /// Summary due after every `interval` processed samples
    pub fn periodic_summary(&self, interval: u64) -> Option<StatsSummary> {
        if interval > 0 && self.total_processed > 0 && self.total_processed % interval == 0 {
            Some(self.summary())
        } else {
            None
        }
    }

    /// Snapshot with percentages
    pub fn summary(&self) -> StatsSummary {
        let percent = |count: u64| {
            if self.total_processed > 0 {
                count as f64 / self.total_processed as f64 * 100.0
            } else {
                0.0
            }
        };

        StatsSummary {
            total_processed: self.total_processed,
            good_behavior: self.good_behavior,
            bad_behavior: self.bad_behavior,
            good_pct: percent(self.good_behavior),
            bad_pct: percent(self.bad_behavior),
            active_vehicles: self.active_vehicles,
            dropped: self.dropped,
        }
    }
}

/// Point-in-time statistics summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_processed: u64,
    pub good_behavior: u64,
    pub bad_behavior: u64,
    pub good_pct: f64,
    pub bad_pct: f64,
    pub active_vehicles: usize,
    pub dropped: u64,
}

impl StatsSummary {
    /// Emit the summary as a banner of info lines
    pub fn log(&self) {
        let rule = "=".repeat(60);
        info!("{}", rule);
        for line in self.to_string().lines() {
            info!("{}", line);
        }
        info!("{}", rule);
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STATISTICS - Total Processed: {}", self.total_processed)?;
        writeln!(f, "Good Behavior: {} ({:.1}%)", self.good_behavior, self.good_pct)?;
        writeln!(f, "Bad Behavior: {} ({:.1}%)", self.bad_behavior, self.bad_pct)?;
        writeln!(f, "Active Vehicles: {}", self.active_vehicles)?;
        write!(f, "Dropped Messages: {}", self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_percentages() {
        let mut stats = BehaviorStats::new();
        assert_eq!(stats.record(BehaviorLabel::Good), 1);
        assert_eq!(stats.record(BehaviorLabel::Bad), 2);
        assert_eq!(stats.record(BehaviorLabel::Bad), 3);
        assert_eq!(stats.record(BehaviorLabel::Bad), 4);
        stats.record_drop("malformed_payload");
        stats.set_active_vehicles(2);

        let summary = stats.summary();
        assert_eq!(summary.total_processed, 4);
        assert_eq!(summary.good_behavior, 1);
        assert_eq!(summary.bad_behavior, 3);
        assert_eq!(summary.good_pct, 25.0);
        assert_eq!(summary.bad_pct, 75.0);
        assert_eq!(summary.active_vehicles, 2);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn test_empty_summary_has_zero_percentages() {
        let summary = BehaviorStats::new().summary();
        assert_eq!(summary.good_pct, 0.0);
        assert_eq!(summary.bad_pct, 0.0);
    }

    #[test]
    fn test_periodic_summary_every_interval() {
        let mut stats = BehaviorStats::new();
        assert!(stats.periodic_summary(2).is_none());

        let due: Vec<u64> = (0..5)
            .filter_map(|_| {
                stats.record(BehaviorLabel::Good);
                stats.periodic_summary(2).map(|summary| summary.total_processed)
            })
            .collect();
        assert_eq!(due, vec![2, 4]);

        // drops do not advance the interval
        stats.record_drop("malformed_payload");
        assert!(stats.periodic_summary(2).is_none());
        assert!(stats.periodic_summary(0).is_none());
    }

    #[test]
    fn test_summary_display() {
        let mut stats = BehaviorStats::new();
        stats.record(BehaviorLabel::Good);
        stats.record(BehaviorLabel::Bad);
        stats.set_active_vehicles(1);

        let text = stats.summary().to_string();
        assert!(text.contains("Total Processed: 2"));
        assert!(text.contains("Good Behavior: 1 (50.0%)"));
        assert!(text.contains("Active Vehicles: 1"));
    }
}
