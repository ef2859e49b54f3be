//! Metrics collection.
//!
//! # Metrics
//! - `reveal_runs_total` (counter): finished runs by outcome
//! - `rpc_requests_total` (counter): node calls by endpoint, outcome
//! - `signer_requests_total` (counter): signer calls by operation, outcome

use metrics::counter;

/// Record a finished reveal run. `outcome` is a stage name or `"success"`.
pub fn record_reveal_run(outcome: &'static str) {
    counter!("reveal_runs_total", "outcome" => outcome).increment(1);
}

/// Record one call against the node.
pub fn record_rpc_request(endpoint: &'static str, success: bool) {
    counter!(
        "rpc_requests_total",
        "endpoint" => endpoint,
        "outcome" => outcome_label(success)
    )
    .increment(1);
}

/// Record one call against the signing service.
pub fn record_signer_request(operation: &'static str, success: bool) {
    counter!(
        "signer_requests_total",
        "operation" => operation,
        "outcome" => outcome_label(success)
    )
    .increment(1);
}

fn outcome_label(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "error"
    }
}
