use std::{fmt, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    classify::{classify_error, ErrorClass},
    seed::SeedReport,
};

#[async_trait]
pub trait Database: Send + Sync {
    async fn can_connect(&self) -> Result<bool>;

    async fn migrate(&self) -> Result<()>;

    async fn seed(&self) -> Result<SeedReport>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub startup_delay: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(10),
            max_retries: 5,
            retry_delay: Duration::from_secs(15),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapPhase {
    Idle,
    Connecting,
    Migrating,
    Seeding,
    Ready,
    Failed { attempt: u32 },
    Terminal,
}

impl BootstrapPhase {
    pub fn is_ready(self) -> bool {
        self == BootstrapPhase::Ready
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapPhase::Idle => f.write_str("idle"),
            BootstrapPhase::Connecting => f.write_str("connecting"),
            BootstrapPhase::Migrating => f.write_str("migrating"),
            BootstrapPhase::Seeding => f.write_str("seeding"),
            BootstrapPhase::Ready => f.write_str("ready"),
            BootstrapPhase::Failed { attempt } => write!(f, "failed (attempt {attempt})"),
            BootstrapPhase::Terminal => f.write_str("terminal"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    TransientFailure,
    FatalFailure,
}

impl AttemptOutcome {
    fn label(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::TransientFailure => "transient",
            AttemptOutcome::FatalFailure => "fatal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapAttempt {
    pub attempt_number: u32,
    pub last_error: Option<String>,
    pub outcome: AttemptOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub attempts: Vec<BootstrapAttempt>,
    pub ready: bool,
    pub cancelled: bool,
    /// Every configured attempt ran and failed transiently.
    pub exhausted: bool,
    pub seed: Option<SeedReport>,
}

pub struct Bootstrapper {
    db: Arc<dyn Database>,
    cfg: BootstrapConfig,
    phase: watch::Sender<BootstrapPhase>,
}

impl Bootstrapper {
    pub fn new(db: Arc<dyn Database>, cfg: BootstrapConfig) -> Self {
        let (phase, _) = watch::channel(BootstrapPhase::Idle);
        Self { db, cfg, phase }
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapPhase> {
        self.phase.subscribe()
    }

    pub fn config(&self) -> BootstrapConfig {
        self.cfg
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<BootstrapReport> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(&self, cancel: CancellationToken) -> BootstrapReport {
        let mut report = BootstrapReport::default();

        if !self.cfg.startup_delay.is_zero() {
            info!(
                delay_secs = self.cfg.startup_delay.as_secs(),
                "waiting before database bootstrap"
            );
            if !pause(&cancel, self.cfg.startup_delay).await {
                info!("database bootstrap cancelled before first attempt");
                report.cancelled = true;
                self.set_phase(BootstrapPhase::Terminal);
                return report;
            }
        }

        if self.cfg.max_retries == 0 {
            error!("database bootstrap has no attempts configured; continuing without database");
            self.set_phase(BootstrapPhase::Terminal);
            return report;
        }

        let max_retries = self.cfg.max_retries;
        for attempt in 1..=max_retries {
            match self.attempt().await {
                Ok(seed) => {
                    record_attempt(AttemptOutcome::Success);
                    report.attempts.push(BootstrapAttempt {
                        attempt_number: attempt,
                        last_error: None,
                        outcome: AttemptOutcome::Success,
                    });
                    report.ready = true;
                    report.seed = Some(seed);
                    self.set_phase(BootstrapPhase::Ready);
                    info!(attempt, "database ready");
                    return report;
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    let class = classify_error(&message);
                    let outcome = match class {
                        ErrorClass::Transient => AttemptOutcome::TransientFailure,
                        ErrorClass::Fatal => AttemptOutcome::FatalFailure,
                    };
                    record_attempt(outcome);
                    report.attempts.push(BootstrapAttempt {
                        attempt_number: attempt,
                        last_error: Some(message.clone()),
                        outcome,
                    });
                    self.set_phase(BootstrapPhase::Failed { attempt });

                    if class == ErrorClass::Fatal {
                        error!(
                            attempt,
                            max_retries,
                            error = %message,
                            "database bootstrap failed with a non-transient error; not retrying"
                        );
                        break;
                    }
                    if attempt >= max_retries {
                        error!(
                            attempt,
                            max_retries,
                            error = %message,
                            "database bootstrap failed; retries exhausted"
                        );
                        report.exhausted = true;
                        break;
                    }

                    warn!(
                        attempt,
                        max_retries,
                        retry_in_secs = self.cfg.retry_delay.as_secs(),
                        error = %message,
                        "database bootstrap attempt failed; retrying"
                    );
                    if !pause(&cancel, self.cfg.retry_delay).await {
                        info!(attempt, "database bootstrap cancelled between attempts");
                        report.cancelled = true;
                        break;
                    }
                }
            }
        }

        if report.exhausted {
            error!("all database bootstrap attempts failed; continuing without database");
        }
        self.set_phase(BootstrapPhase::Terminal);
        report
    }

    async fn attempt(&self) -> Result<SeedReport> {
        self.set_phase(BootstrapPhase::Connecting);
        if !self.db.can_connect().await? {
            return Err(anyhow!("database connection probe failed"));
        }

        info!("database connection successful, running migrations");
        self.set_phase(BootstrapPhase::Migrating);
        self.db.migrate().await?;
        info!("migrations completed");

        self.set_phase(BootstrapPhase::Seeding);
        self.db.seed().await
    }

    fn set_phase(&self, phase: BootstrapPhase) {
        self.phase.send_replace(phase);
    }
}

// false when cancelled
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = sleep(delay) => true,
    }
}

fn record_attempt(outcome: AttemptOutcome) {
    metrics::counter!("bootstrap_attempts_total", "outcome" => outcome.label()).increment(1);
}
