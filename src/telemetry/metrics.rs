//! Prometheus metrics setup and authorization metric definitions

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const DECISIONS_TOTAL: &str = "menagerie_authz_decisions_total";
pub const EVALUATION_DURATION: &str = "menagerie_authz_evaluation_duration_seconds";
pub const REDACTIONS_TOTAL: &str = "menagerie_authz_redactions_total";

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    // Policy checks are mostly a handful of indexed lookups, hence the
    // sub-millisecond buckets.
    let buckets = vec![
        0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// What a decision guarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A registered or ad-hoc operation.
    Operation,
    /// A single field of a response object.
    Field,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Operation => "operation",
            Gate::Field => "field",
        }
    }
}

/// Register metric descriptions.
pub fn describe_metrics() {
    describe_counter!(
        DECISIONS_TOTAL,
        "Authorization decisions by gate, target and outcome"
    );
    describe_histogram!(
        EVALUATION_DURATION,
        "Time spent evaluating a gate's policies in seconds"
    );
    describe_counter!(
        REDACTIONS_TOTAL,
        "Fields replaced by their empty value because the field policy denied"
    );
}

/// Record one decision. `target` is the operation name or `Type.field`;
/// `decision` is "allow", "deny" or "error".
pub fn record_decision(gate: Gate, target: &str, decision: &'static str, elapsed: Duration) {
    counter!(
        DECISIONS_TOTAL,
        "gate" => gate.as_str(),
        "target" => target.to_string(),
        "decision" => decision
    )
    .increment(1);
    histogram!(
        EVALUATION_DURATION,
        "gate" => gate.as_str(),
        "target" => target.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_redaction(type_name: &str, field: &str) {
    counter!(REDACTIONS_TOTAL, "field" => format!("{}.{}", type_name, field)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_labels() {
        assert_eq!(Gate::Operation.as_str(), "operation");
        assert_eq!(Gate::Field.as_str(), "field");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No global recorder is installed in unit tests.
        record_decision(Gate::Operation, "editCharacter", "allow", Duration::from_millis(3));
        record_decision(Gate::Field, "Character.pendingOwnership", "deny", Duration::ZERO);
        record_redaction("Character", "pendingOwnership");
        describe_metrics();
    }
}
