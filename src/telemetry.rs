// src/telemetry.rs
//! Metric descriptions. The crate only emits through the `metrics` facade;
//! whichever recorder the host installs picks the series up.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time registration so series carry help text.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed fetch attempts.");
        describe_counter!("feed_fetch_errors_total", "Feed fetches that failed or timed out.");
        describe_counter!("feed_entries_total", "Entries normalized from fetched feeds.");
        describe_counter!(
            "feed_parse_errors_total",
            "Per-entry and per-feed parse errors."
        );
        describe_counter!(
            "dedup_seen_total",
            "Entries dropped because an earlier run presented them."
        );
        describe_counter!("scorer_calls_total", "Relevance judge invocations.");
        describe_counter!("scorer_retries_total", "Judge calls retried after a transient error.");
        describe_counter!(
            "scorer_failures_total",
            "Entries whose scoring ended as FAILED."
        );
        describe_histogram!("scorer_call_ms", "Judge call latency in milliseconds.");
        describe_gauge!("selection_size", "Entries in the last run's selection.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when a pipeline run last finished.");
    });
}
