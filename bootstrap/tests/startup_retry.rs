use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use quickcrm_bootstrap::{
    seed::SeedReport,
    startup::{AttemptOutcome, BootstrapConfig, BootstrapPhase, Bootstrapper, Database},
};
use tokio_util::sync::CancellationToken;

type Step = Box<dyn Fn(u32) -> Result<()> + Send + Sync>;

/// Database double whose probe and migration results are scripted per attempt.
struct ScriptedDb {
    probes: AtomicU32,
    migrations: AtomicU32,
    seeds: AtomicU32,
    probe: Step,
    migrate: Step,
}

impl ScriptedDb {
    fn new(probe: Step, migrate: Step) -> Arc<Self> {
        Arc::new(Self {
            probes: AtomicU32::new(0),
            migrations: AtomicU32::new(0),
            seeds: AtomicU32::new(0),
            probe,
            migrate,
        })
    }

    fn healthy() -> Arc<Self> {
        Self::new(Box::new(|_| Ok(())), Box::new(|_| Ok(())))
    }

    fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for ScriptedDb {
    async fn can_connect(&self) -> Result<bool> {
        let attempt = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        (self.probe)(attempt).map(|_| true)
    }

    async fn migrate(&self) -> Result<()> {
        let attempt = self.probes.load(Ordering::SeqCst);
        self.migrations.fetch_add(1, Ordering::SeqCst);
        (self.migrate)(attempt)
    }

    async fn seed(&self) -> Result<SeedReport> {
        self.seeds.fetch_add(1, Ordering::SeqCst);
        Ok(SeedReport::default())
    }
}

/// Probe that reports "not reachable" instead of raising.
struct UnreachableDb {
    probes: AtomicU32,
}

#[async_trait]
impl Database for UnreachableDb {
    async fn can_connect(&self) -> Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    async fn migrate(&self) -> Result<()> {
        Err(anyhow!("migrate must not run without a connection"))
    }

    async fn seed(&self) -> Result<SeedReport> {
        Err(anyhow!("seed must not run without a connection"))
    }
}

fn quick(max_retries: u32) -> BootstrapConfig {
    BootstrapConfig {
        startup_delay: Duration::ZERO,
        max_retries,
        retry_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn healthy_database_becomes_ready_on_first_attempt() {
    let db = ScriptedDb::healthy();
    let bootstrapper = Bootstrapper::new(db.clone(), quick(5));
    let phase = bootstrapper.subscribe();

    let report = bootstrapper.run(CancellationToken::new()).await;

    assert!(report.ready);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Success);
    assert_eq!(*phase.borrow(), BootstrapPhase::Ready);
    assert_eq!(db.migrations.load(Ordering::SeqCst), 1);
    assert_eq!(db.seeds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_errors_exhaust_retries_without_raising() {
    let db = ScriptedDb::new(
        Box::new(|_| Err(anyhow!("Database is not currently available (Error 40613)"))),
        Box::new(|_| Ok(())),
    );
    let bootstrapper = Bootstrapper::new(db.clone(), quick(3));
    let phase = bootstrapper.subscribe();

    let report = bootstrapper.run(CancellationToken::new()).await;

    assert!(!report.ready);
    assert!(!report.cancelled);
    assert!(report.exhausted);
    assert_eq!(db.probes(), 3);
    assert_eq!(report.attempts.len(), 3);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::TransientFailure));
    assert_eq!(
        report.attempts.iter().map(|a| a.attempt_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(*phase.borrow(), BootstrapPhase::Terminal);
}

#[tokio::test]
async fn fatal_error_short_circuits_remaining_attempts() {
    let db = ScriptedDb::new(
        Box::new(|_| Ok(())),
        Box::new(|_| Err(anyhow!("Invalid column name"))),
    );
    let bootstrapper = Bootstrapper::new(db.clone(), quick(5));

    let report = bootstrapper.run(CancellationToken::new()).await;

    assert!(!report.ready);
    assert!(!report.exhausted);
    assert_eq!(db.probes(), 1);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::FatalFailure);
    assert_eq!(
        report.attempts[0].last_error.as_deref(),
        Some("Invalid column name")
    );
    assert_eq!(db.seeds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn recovers_after_transient_failures() {
    let db = ScriptedDb::new(
        Box::new(|attempt| {
            if attempt < 3 {
                Err(anyhow!("connection reset by peer"))
            } else {
                Ok(())
            }
        }),
        Box::new(|_| Ok(())),
    );
    let bootstrapper = Bootstrapper::new(db.clone(), quick(5));

    let report = bootstrapper.run(CancellationToken::new()).await;

    assert!(report.ready);
    assert_eq!(report.attempts.len(), 3);
    assert_eq!(report.attempts[2].outcome, AttemptOutcome::Success);
    assert_eq!(db.seeds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_probe_is_retried_as_transient() {
    let db = Arc::new(UnreachableDb {
        probes: AtomicU32::new(0),
    });
    let bootstrapper = Bootstrapper::new(db.clone(), quick(2));

    let report = bootstrapper.run(CancellationToken::new()).await;

    assert_eq!(db.probes.load(Ordering::SeqCst), 2);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::TransientFailure));
    assert_eq!(
        report.attempts[0].last_error.as_deref(),
        Some("database connection probe failed")
    );
}

#[tokio::test]
async fn zero_retries_means_no_attempts() {
    let db = ScriptedDb::healthy();
    let bootstrapper = Bootstrapper::new(db.clone(), quick(0));
    let phase = bootstrapper.subscribe();

    let report = bootstrapper.run(CancellationToken::new()).await;

    assert!(report.attempts.is_empty());
    assert!(!report.ready);
    assert_eq!(db.probes(), 0);
    assert_eq!(*phase.borrow(), BootstrapPhase::Terminal);
}

#[tokio::test(start_paused = true)]
async fn waits_for_startup_delay_before_first_attempt() {
    let db = ScriptedDb::healthy();
    let bootstrapper = Bootstrapper::new(
        db.clone(),
        BootstrapConfig {
            startup_delay: Duration::from_secs(10),
            max_retries: 5,
            retry_delay: Duration::from_secs(15),
        },
    );
    let mut phase = bootstrapper.subscribe();
    let handle = bootstrapper.spawn(CancellationToken::new());

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(db.probes(), 0);
    assert_eq!(*phase.borrow_and_update(), BootstrapPhase::Idle);

    let report = handle.await.expect("bootstrap task");
    assert!(report.ready);
    assert_eq!(db.probes(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_startup_delay_skips_all_attempts() {
    let db = ScriptedDb::healthy();
    let bootstrapper = Bootstrapper::new(db.clone(), BootstrapConfig::default());
    let cancel = CancellationToken::new();
    let handle = bootstrapper.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let report = handle.await.expect("bootstrap task");
    assert!(report.cancelled);
    assert!(report.attempts.is_empty());
    assert_eq!(db.probes(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_between_attempts_stops_retrying() {
    let db = ScriptedDb::new(
        Box::new(|_| Err(anyhow!("timeout expired"))),
        Box::new(|_| Ok(())),
    );
    let bootstrapper = Bootstrapper::new(
        db.clone(),
        BootstrapConfig {
            startup_delay: Duration::ZERO,
            max_retries: 5,
            retry_delay: Duration::from_secs(15),
        },
    );
    let cancel = CancellationToken::new();
    let handle = bootstrapper.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(20)).await;
    cancel.cancel();

    let report = handle.await.expect("bootstrap task");
    assert!(report.cancelled);
    assert!(!report.exhausted);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(db.probes(), 2);
}
