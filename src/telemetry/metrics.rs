// SPDX-License-Identifier: MIT

//! In-process metrics aggregation.
//!
//! Counters and histograms are keyed by low-cardinality label sets
//! (matched route patterns, never raw paths) and held in lock-free maps.
//! Every recording is mirrored to the OpenTelemetry instruments so the
//! same series reach the OTLP collector, while `render_prometheus`
//! serves the local aggregate at `/metrics`. State resets only on
//! process restart.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{global, KeyValue};

/// Histogram bucket bounds in seconds, Prometheus-style cumulative.
const DURATION_BUCKETS: [f64; 10] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Label key for HTTP request series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpKey {
    pub method: String,
    /// Matched route pattern, e.g. `/api/profile/learn_status`
    pub path: String,
    pub status: u16,
}

/// Label key for database series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbKey {
    /// SQL verb: SELECT, INSERT, ...
    pub operation: String,
    pub table: String,
}

/// Fixed-bucket duration histogram with atomic cells.
#[derive(Default)]
struct DurationHistogram {
    count: AtomicU64,
    sum_micros: AtomicU64,
    buckets: [AtomicU64; DURATION_BUCKETS.len()],
}

impl DurationHistogram {
    fn record(&self, duration: Duration) {
        let secs = duration.as_secs_f64();
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        for (i, bound) in DURATION_BUCKETS.iter().enumerate() {
            if secs <= *bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

/// Process-wide metrics registry shared by middleware and the DB layer.
pub struct MetricsRegistry {
    service_name: String,
    service_version: String,

    http_requests: DashMap<HttpKey, AtomicU64>,
    http_durations: DashMap<(String, String), DurationHistogram>,
    db_queries: DashMap<DbKey, AtomicU64>,
    db_durations: DashMap<DbKey, DurationHistogram>,
    health_checks_ok: AtomicU64,
    health_checks_failed: AtomicU64,

    // OTel mirrors (exported over OTLP by the periodic reader)
    otel_http_requests: Counter<u64>,
    otel_http_duration: Histogram<f64>,
    otel_db_queries: Counter<u64>,
    otel_db_duration: Histogram<f64>,
    otel_health_checks: Counter<u64>,
}

impl MetricsRegistry {
    pub fn new(service_name: &str, service_version: &str) -> Self {
        let meter = global::meter("learntrack");

        Self {
            service_name: service_name.to_string(),
            service_version: service_version.to_string(),
            http_requests: DashMap::new(),
            http_durations: DashMap::new(),
            db_queries: DashMap::new(),
            db_durations: DashMap::new(),
            health_checks_ok: AtomicU64::new(0),
            health_checks_failed: AtomicU64::new(0),
            otel_http_requests: meter
                .u64_counter("http_requests_total")
                .with_description("Total number of HTTP requests")
                .build(),
            otel_http_duration: meter
                .f64_histogram("http_request_duration_seconds")
                .with_description("HTTP request duration in seconds")
                .with_unit("s")
                .build(),
            otel_db_queries: meter
                .u64_counter("db_queries_total")
                .with_description("Total number of database queries")
                .build(),
            otel_db_duration: meter
                .f64_histogram("db_query_duration_seconds")
                .with_description("Database query duration in seconds")
                .with_unit("s")
                .build(),
            otel_health_checks: meter
                .u64_counter("health_check_total")
                .with_description("Total number of health checks")
                .build(),
        }
    }

    /// Record a completed HTTP request.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        let key = HttpKey {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };
        self.http_requests
            .entry(key)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
        self.http_durations
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .record(duration);

        let labels = [
            KeyValue::new("method", method.to_string()),
            KeyValue::new("path", path.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.otel_http_requests.add(1, &labels);
        self.otel_http_duration.record(duration.as_secs_f64(), &labels);
    }

    /// Record a completed database operation.
    pub fn record_db_query(&self, operation: &str, table: &str, duration: Duration) {
        let key = DbKey {
            operation: operation.to_string(),
            table: table.to_string(),
        };
        self.db_queries
            .entry(key.clone())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
        self.db_durations.entry(key).or_default().record(duration);

        let labels = [
            KeyValue::new("operation", operation.to_string()),
            KeyValue::new("table", table.to_string()),
        ];
        self.otel_db_queries.add(1, &labels);
        self.otel_db_duration.record(duration.as_secs_f64(), &labels);
    }

    /// Record a /health probe outcome.
    pub fn record_health_check(&self, healthy: bool) {
        let cell = if healthy {
            &self.health_checks_ok
        } else {
            &self.health_checks_failed
        };
        cell.fetch_add(1, Ordering::Relaxed);

        self.otel_health_checks
            .add(1, &[KeyValue::new("healthy", healthy.to_string())]);
    }

    /// Total HTTP requests across all label sets.
    pub fn total_requests(&self) -> u64 {
        self.http_requests
            .iter()
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .sum()
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(1024);

        out.push_str("# HELP http_requests_total Total number of HTTP requests\n");
        out.push_str("# TYPE http_requests_total counter\n");
        let mut request_lines: Vec<String> = self
            .http_requests
            .iter()
            .map(|entry| {
                let key = entry.key();
                format!(
                    "http_requests_total{{method=\"{}\",path=\"{}\",status=\"{}\"}} {}\n",
                    escape_label(&key.method),
                    escape_label(&key.path),
                    key.status,
                    entry.value().load(Ordering::Relaxed)
                )
            })
            .collect();
        request_lines.sort();
        for line in request_lines {
            out.push_str(&line);
        }

        out.push_str("# HELP http_request_duration_seconds HTTP request duration in seconds\n");
        out.push_str("# TYPE http_request_duration_seconds histogram\n");
        let mut duration_keys: Vec<(String, String)> = self
            .http_durations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        duration_keys.sort();
        for (method, path) in duration_keys {
            if let Some(hist) = self.http_durations.get(&(method.clone(), path.clone())) {
                render_histogram(
                    &mut out,
                    "http_request_duration_seconds",
                    &format!(
                        "method=\"{}\",path=\"{}\"",
                        escape_label(&method),
                        escape_label(&path)
                    ),
                    &hist,
                );
            }
        }

        out.push_str("# HELP db_queries_total Total number of database queries\n");
        out.push_str("# TYPE db_queries_total counter\n");
        let mut db_lines: Vec<String> = self
            .db_queries
            .iter()
            .map(|entry| {
                let key = entry.key();
                format!(
                    "db_queries_total{{operation=\"{}\",table=\"{}\"}} {}\n",
                    escape_label(&key.operation),
                    escape_label(&key.table),
                    entry.value().load(Ordering::Relaxed)
                )
            })
            .collect();
        db_lines.sort();
        for line in db_lines {
            out.push_str(&line);
        }

        out.push_str("# HELP db_query_duration_seconds Database query duration in seconds\n");
        out.push_str("# TYPE db_query_duration_seconds histogram\n");
        let mut db_keys: Vec<DbKey> = self
            .db_durations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        db_keys.sort_by(|a, b| (&a.operation, &a.table).cmp(&(&b.operation, &b.table)));
        for key in db_keys {
            if let Some(hist) = self.db_durations.get(&key) {
                render_histogram(
                    &mut out,
                    "db_query_duration_seconds",
                    &format!(
                        "operation=\"{}\",table=\"{}\"",
                        escape_label(&key.operation),
                        escape_label(&key.table)
                    ),
                    &hist,
                );
            }
        }

        out.push_str("# HELP health_check_total Total number of health checks\n");
        out.push_str("# TYPE health_check_total counter\n");
        let _ = writeln!(
            out,
            "health_check_total{{healthy=\"true\"}} {}",
            self.health_checks_ok.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "health_check_total{{healthy=\"false\"}} {}",
            self.health_checks_failed.load(Ordering::Relaxed)
        );

        // Always present, even before the first request.
        out.push_str("# HELP service_info Service information\n");
        out.push_str("# TYPE service_info gauge\n");
        let _ = writeln!(
            out,
            "service_info{{service=\"{}\",version=\"{}\"}} 1",
            escape_label(&self.service_name),
            escape_label(&self.service_version)
        );

        out
    }
}

fn render_histogram(out: &mut String, name: &str, labels: &str, hist: &DurationHistogram) {
    for (i, bound) in DURATION_BUCKETS.iter().enumerate() {
        let _ = writeln!(
            out,
            "{name}_bucket{{{labels},le=\"{bound}\"}} {}",
            hist.buckets[i].load(Ordering::Relaxed)
        );
    }
    let count = hist.count.load(Ordering::Relaxed);
    let _ = writeln!(out, "{name}_bucket{{{labels},le=\"+Inf\"}} {count}");
    let _ = writeln!(out, "{name}_sum{{{labels}}} {}", hist.sum_seconds());
    let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
}

/// Escape a label value per the Prometheus exposition format.
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
