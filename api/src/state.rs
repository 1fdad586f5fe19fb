use metrics_exporter_prometheus::PrometheusHandle;
use quickcrm_bootstrap::{startup::BootstrapPhase, store::Store};
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub bootstrap: watch::Receiver<BootstrapPhase>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn bootstrap_phase(&self) -> BootstrapPhase {
        *self.bootstrap.borrow()
    }
}
