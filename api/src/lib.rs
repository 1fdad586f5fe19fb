pub mod app;
pub mod config;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod util;
