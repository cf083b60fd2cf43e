//! Scoring statistics for the fraud scoring service.

use crate::types::prediction::{PredictionResult, ScoringMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept before the oldest half is dropped
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for scoring requests
pub struct ScoringMetrics {
    /// Transactions scored successfully
    pub transactions_scored: AtomicU64,
    /// Transactions that failed during scoring
    pub scoring_failures: AtomicU64,
    /// Transactions scored by the model
    pub model_scored: AtomicU64,
    /// Transactions scored by the heuristic
    pub fallback_scored: AtomicU64,
    /// Transactions flagged as fraud
    pub flagged: AtomicU64,
    /// Scoring times (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
    started_at: DateTime<Utc>,
}

impl ScoringMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            scoring_failures: AtomicU64::new(0),
            model_scored: AtomicU64::new(0),
            fallback_scored: AtomicU64::new(0),
            flagged: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_prediction(&self, mode: ScoringMode, result: &PredictionResult, elapsed: Duration) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);

        match mode {
            ScoringMode::Model => self.model_scored.fetch_add(1, Ordering::Relaxed),
            ScoringMode::Fallback => self.fallback_scored.fetch_add(1, Ordering::Relaxed),
        };

        if result.is_fraud {
            self.flagged.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(elapsed.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }

        let bucket = (result.fraud_probability * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a scoring failure
    pub fn record_failure(&self) {
        self.scoring_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Latency statistics over the retained samples
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = match self.latencies.read() {
            Ok(times) => times.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Current throughput (transactions per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Probability distribution in tenths
    pub fn score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: self.start_time.elapsed().as_secs(),
            transactions_scored: self.transactions_scored.load(Ordering::Relaxed),
            scoring_failures: self.scoring_failures.load(Ordering::Relaxed),
            model_scored: self.model_scored.load(Ordering::Relaxed),
            fallback_scored: self.fallback_scored.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
            throughput: self.throughput(),
            score_distribution: self.score_distribution(),
            latency: self.latency_stats(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let flag_rate = if snapshot.transactions_scored > 0 {
            (snapshot.flagged as f64 / snapshot.transactions_scored as f64) * 100.0
        } else {
            0.0
        };

        info!(
            scored = snapshot.transactions_scored,
            failures = snapshot.scoring_failures,
            model = snapshot.model_scored,
            fallback = snapshot.fallback_scored,
            flagged = snapshot.flagged,
            flag_rate = format!("{:.1}%", flag_rate),
            throughput = format!("{:.1} tx/s", snapshot.throughput),
            "Scoring summary"
        );
        info!(
            mean_us = snapshot.latency.mean_us,
            p50_us = snapshot.latency.p50_us,
            p95_us = snapshot.latency.p95_us,
            p99_us = snapshot.latency.p99_us,
            "Scoring latency"
        );

        let total: u64 = snapshot.score_distribution.iter().sum();
        for (i, &count) in snapshot.score_distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = (count as f64 / total as f64) * 100.0;
            info!(
                "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Body of `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub transactions_scored: u64,
    pub scoring_failures: u64,
    pub model_scored: u64,
    pub fallback_scored: u64,
    pub flagged: u64,
    pub throughput: f64,
    pub score_distribution: [u64; 10],
    pub latency: LatencyStats,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let period = Duration::from_secs(self.interval_secs);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
