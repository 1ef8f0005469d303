//! Thin façade over `prometheus` for the handful of counters named in
//! SPEC_FULL.md §B ("Metrics"): bad-response increments, processed sync
//! batches, and pending-block-queue depth. No HTTP exporter lives here —
//! that surface is explicitly out of scope (spec.md §1 Non-goals); this
//! module only owns the metric handles and lets call sites update them
//! inline.

use prometheus::{IntCounter, IntGauge, Opts};
use std::sync::OnceLock;

struct Metrics {
    bad_responses_total: IntCounter,
    processed_batches_total: IntCounter,
    pending_queue_size: IntGauge,
}

fn metrics() -> &'static Metrics {
    static METRICS: OnceLock<Metrics> = OnceLock::new();
    METRICS.get_or_init(|| Metrics {
        bad_responses_total: IntCounter::with_opts(Opts::new(
            "p2p_bad_responses_total",
            "Total bad-response increments recorded across all peers",
        ))
        .expect("static metric options are well-formed"),
        processed_batches_total: IntCounter::with_opts(Opts::new(
            "p2p_processed_batches_total",
            "Total range-sync batches successfully processed across all peers",
        ))
        .expect("static metric options are well-formed"),
        pending_queue_size: IntGauge::with_opts(Opts::new(
            "p2p_pending_block_queue_size",
            "Current number of blocks held in the pending-block queue",
        ))
        .expect("static metric options are well-formed"),
    })
}

/// Called wherever a peer's bad-response count is incremented
/// (`PeerDb::increment_bad_responses`).
pub fn inc_bad_responses() {
    metrics().bad_responses_total.inc();
}

/// Called wherever a peer's processed-batch count is incremented
/// (`PeerDb::increment_processed_batches`).
pub fn inc_processed_batches() {
    metrics().processed_batches_total.inc();
}

/// Called whenever the pending-block queue's size changes.
pub fn set_pending_queue_size(size: usize) {
    metrics().pending_queue_size.set(size as i64);
}
