use clap::{Args as ClapArgs, Parser};
use quickcrm_bootstrap::cli::{BootstrapArgs, DatabaseArgs};

use crate::rate_limit::RateLimitConfig;

#[derive(Parser, Debug, Clone)]
pub struct Config {
    #[arg(long, env = "API_BIND", default_value = "0.0.0.0:8081")]
    pub bind: String,
    #[arg(
        long,
        env = "CORS_ORIGIN",
        default_value = "https://quickcrm-app.netlify.app"
    )]
    pub cors_origin: String,
    #[command(flatten)]
    pub database: DatabaseArgs,
    #[command(flatten)]
    pub rate_limit: RateLimitArgs,
    #[command(flatten)]
    pub bootstrap: BootstrapArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RateLimitArgs {
    #[arg(
        long = "rate-limit-enabled",
        env = "RATE_LIMIT_ENABLED",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub enabled: bool,
    #[arg(
        long = "rate-limit-permits",
        env = "RATE_LIMIT_PERMIT_LIMIT",
        default_value_t = 100
    )]
    pub permit_limit: u32,
    #[arg(
        long = "rate-limit-window-minutes",
        env = "RATE_LIMIT_WINDOW_MINUTES",
        default_value_t = 1
    )]
    pub window_minutes: u32,
    #[arg(
        long = "rate-limit-sweep-secs",
        env = "RATE_LIMIT_SWEEP_SECS",
        default_value_t = 300,
        help = "Interval for dropping stale client windows; 0 disables the sweep"
    )]
    pub sweep_secs: u64,
}

impl RateLimitArgs {
    pub fn config(&self) -> Option<RateLimitConfig> {
        self.enabled.then(|| RateLimitConfig {
            permit_limit: self.permit_limit,
            window_minutes: self.window_minutes,
        })
    }
}
