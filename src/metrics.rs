//! Request counters and latency statistics for the prediction service.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by the HTTP handlers
pub struct ServiceMetrics {
    /// Requests per endpoint
    requests: RwLock<BTreeMap<String, u64>>,
    /// Failed requests
    pub errors: AtomicU64,
    /// Rows scored across all prediction requests
    pub rows_predicted: AtomicU64,
    /// Rows scored with at least one unknown category
    pub rows_degraded: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(BTreeMap::new()),
            errors: AtomicU64::new(0),
            rows_predicted: AtomicU64::new(0),
            rows_degraded: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a handled request and its latency
    pub fn record_request(&self, endpoint: &str, processing_time: Duration) {
        if let Ok(mut requests) = self.requests.write() {
            *requests.entry(endpoint.to_string()).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record the rows scored by one prediction request
    pub fn record_predictions(&self, rows: usize, degraded: usize) {
        self.rows_predicted.fetch_add(rows as u64, Ordering::Relaxed);
        self.rows_degraded.fetch_add(degraded as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn get_requests_by_endpoint(&self) -> BTreeMap<String, u64> {
        self.requests.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Point-in-time view for the metrics endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            requests: self.get_requests_by_endpoint(),
            errors: self.errors.load(Ordering::Relaxed),
            rows_predicted: self.rows_predicted.load(Ordering::Relaxed),
            rows_degraded: self.rows_degraded.load(Ordering::Relaxed),
            processing: self.get_processing_stats(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let total_requests: u64 = snapshot.requests.values().sum();
        let degraded_rate = if snapshot.rows_predicted > 0 {
            (snapshot.rows_degraded as f64 / snapshot.rows_predicted as f64) * 100.0
        } else {
            0.0
        };

        info!(
            uptime_secs = snapshot.uptime_secs,
            requests = total_requests,
            errors = snapshot.errors,
            rows_predicted = snapshot.rows_predicted,
            degraded_pct = format!("{degraded_rate:.1}"),
            "Service metrics summary"
        );
        info!(
            "Processing time (μs): mean={} p50={} p95={} p99={} max={}",
            snapshot.processing.mean_us,
            snapshot.processing.p50_us,
            snapshot.processing.p95_us,
            snapshot.processing.p99_us,
            snapshot.processing.max_us
        );
        for (endpoint, count) in &snapshot.requests {
            info!("  {endpoint}: {count} requests");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub requests: BTreeMap<String, u64>,
    pub errors: u64,
    pub rows_predicted: u64,
    pub rows_degraded: u64,
    pub processing: ProcessingStats,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
