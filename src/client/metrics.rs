use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::common::error::VoteErrorKind;
use crate::common::vote::VoteOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptMetric {
    pub target: String,
    pub attempted_at_ms: i64, // milliseconds since epoch
    pub latency_ms: u64,
    pub success: bool,
    pub error_kind: Option<VoteErrorKind>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_attempts: usize,
    pub delivered: usize,
    pub failed: usize,
    pub failure_rate: f64,

    // Latency of delivered attempts (milliseconds)
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub latency_avg_ms: f64,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,
    pub latency_p99_ms: u64,

    // Attempts per target listener
    pub target_distribution: HashMap<String, usize>,

    pub failures_by_kind: HashMap<VoteErrorKind, usize>,
}

#[derive(Debug)]
pub struct RelayMetrics {
    name: String,
    start_time: Instant,
    attempts: Vec<AttemptMetric>,
}

impl RelayMetrics {
    pub fn new(name: String) -> Self {
        Self {
            name,
            start_time: Instant::now(),
            attempts: Vec::new(),
        }
    }

    pub fn record(&mut self, target: &str, outcome: &VoteOutcome, latency: Duration) {
        self.attempts.push(AttemptMetric {
            target: target.to_string(),
            attempted_at_ms: outcome.attempted_at.timestamp_millis(),
            latency_ms: latency.as_millis() as u64,
            success: outcome.success,
            error_kind: outcome.error_kind,
        });
    }

    pub fn attempts(&self) -> &[AttemptMetric] {
        &self.attempts
    }

    pub fn aggregate(&self) -> AggregatedStats {
        let mut stats = AggregatedStats::default();

        if self.attempts.is_empty() {
            return stats;
        }

        stats.total_attempts = self.attempts.len();
        stats.delivered = self.attempts.iter().filter(|a| a.success).count();
        stats.failed = stats.total_attempts - stats.delivered;
        stats.failure_rate = (stats.failed as f64 / stats.total_attempts as f64) * 100.0;

        let mut latencies: Vec<u64> = self
            .attempts
            .iter()
            .filter(|a| a.success)
            .map(|a| a.latency_ms)
            .collect();

        if !latencies.is_empty() {
            latencies.sort_unstable();

            stats.latency_min_ms = latencies[0];
            stats.latency_max_ms = latencies[latencies.len() - 1];
            stats.latency_avg_ms =
                latencies.iter().sum::<u64>() as f64 / latencies.len() as f64;

            stats.latency_p50_ms = percentile(&latencies, 50.0);
            stats.latency_p95_ms = percentile(&latencies, 95.0);
            stats.latency_p99_ms = percentile(&latencies, 99.0);
        }

        for attempt in &self.attempts {
            *stats
                .target_distribution
                .entry(attempt.target.clone())
                .or_insert(0) += 1;
        }

        for kind in self.attempts.iter().filter_map(|a| a.error_kind) {
            *stats.failures_by_kind.entry(kind).or_insert(0) += 1;
        }

        stats
    }

    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let stats = self.aggregate();

        let output = serde_json::json!({
            "name": self.name,
            "duration_secs": self.start_time.elapsed().as_secs(),
            "aggregated_stats": stats,
            "attempts": self.attempts,
        });

        let json_string = serde_json::to_string_pretty(&output)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;

        Ok(())
    }
}

fn percentile(sorted_data: &[u64], percentile: f64) -> u64 {
    if sorted_data.is_empty() {
        return 0;
    }

    let index = (percentile / 100.0 * (sorted_data.len() - 1) as f64).round() as usize;
    sorted_data[index.min(sorted_data.len() - 1)]
}
