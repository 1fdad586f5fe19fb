use std::time::Duration;

use clap::Args as ClapArgs;

use crate::startup::BootstrapConfig;

#[derive(ClapArgs, Debug, Clone)]
pub struct DatabaseArgs {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 30)]
    pub db_acquire_timeout_secs: u64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BootstrapArgs {
    #[arg(
        long = "startup-delay-secs",
        env = "STARTUP_DELAY_SECS",
        default_value_t = 10,
        help = "Seconds to wait after process start before the first database attempt"
    )]
    pub startup_delay_secs: u64,
    #[arg(
        long = "bootstrap-max-retries",
        env = "BOOTSTRAP_MAX_RETRIES",
        default_value_t = 5
    )]
    pub max_retries: u32,
    #[arg(
        long = "bootstrap-retry-delay-secs",
        env = "BOOTSTRAP_RETRY_DELAY_SECS",
        default_value_t = 15
    )]
    pub retry_delay_secs: u64,
}

impl DatabaseArgs {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }
}

impl BootstrapArgs {
    pub fn config(&self) -> BootstrapConfig {
        BootstrapConfig {
            startup_delay: Duration::from_secs(self.startup_delay_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}
