use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const RATE_LIMIT_ADMITTED: &str = "rate_limit_admitted_total";
pub const RATE_LIMIT_REJECTED: &str = "rate_limit_rejected_total";

pub fn install() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| format!("failed to install metrics recorder: {err}"))
}

pub fn record_admitted() {
    metrics::counter!(RATE_LIMIT_ADMITTED).increment(1);
}

pub fn record_rejected() {
    metrics::counter!(RATE_LIMIT_REJECTED).increment(1);
}
