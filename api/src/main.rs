use std::{net::SocketAddr, process, str::FromStr, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use quickcrm_api::{
    app::{self, AppOptions},
    config::Config,
    metrics,
    rate_limit::RateLimiter,
    state::AppState,
};
use quickcrm_bootstrap::{
    cli::{BootstrapArgs, DatabaseArgs},
    startup::Bootstrapper,
    store::Store,
};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server; the database is bootstrapped in the background
    Serve(Config),
    /// Migrate and seed the database in the foreground, then exit
    Bootstrap {
        #[command(flatten)]
        database: DatabaseArgs,
        #[command(flatten)]
        bootstrap: BootstrapArgs,
    },
    /// Probe an HTTP endpoint and exit with success if it is healthy
    Probe {
        /// URL to probe
        #[arg(long, default_value = "http://localhost:8081/health/live")]
        url: String,
        /// Request timeout in seconds
        #[arg(long, default_value_t = 3)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!("{err}");
        eprintln!("{err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("quickcrm_api=info,quickcrm_bootstrap=info,tower_http=info")
    });
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| format!("failed to install tracing subscriber: {err}"))?;

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cfg) => serve(cfg).await,
        Command::Bootstrap {
            database,
            bootstrap,
        } => bootstrap_once(database, bootstrap).await,
        Command::Probe { url, timeout_secs } => probe(url, timeout_secs).await,
    }
}

async fn serve(cfg: Config) -> Result<(), String> {
    let addr = SocketAddr::from_str(cfg.bind.as_str())
        .map_err(|err| format!("invalid bind address '{}': {err}", cfg.bind))?;
    let cors_origin = HeaderValue::from_str(&cfg.cors_origin)
        .map_err(|err| format!("invalid CORS origin '{}': {err}", cfg.cors_origin))?;

    let metrics = match metrics::install() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!("{err}");
            None
        }
    };

    let store = Store::connect_lazy(&cfg.database.database_url, cfg.database.acquire_timeout())
        .map_err(|err| format!("failed to configure database pool: {err:#}"))?;

    let cancel = CancellationToken::new();
    let bootstrapper = Bootstrapper::new(Arc::new(store.clone()), cfg.bootstrap.config());
    let phase = bootstrapper.subscribe();
    let bootstrap_task = bootstrapper.spawn(cancel.child_token());

    let rate_limiter = cfg.rate_limit.config().map(RateLimiter::new);
    match &rate_limiter {
        Some(limiter) => {
            let rl = limiter.config();
            info!(
                permit_limit = rl.permit_limit,
                window_minutes = rl.window_minutes,
                "rate limiting enabled"
            );
            if cfg.rate_limit.sweep_secs > 0 {
                app::spawn_sweeper(
                    limiter.clone(),
                    Duration::from_secs(cfg.rate_limit.sweep_secs),
                    cancel.child_token(),
                );
            }
        }
        None => info!("rate limiting disabled"),
    }

    let state = AppState {
        store,
        bootstrap: phase,
        metrics,
    };
    let app = app::build(
        state,
        AppOptions {
            rate_limiter,
            cors_origin: Some(cors_origin),
        },
    );

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| format!("failed to bind listener on {addr}: {err}"))?;

    info!("api listening on {addr}");

    let on_shutdown = cancel.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        on_shutdown.cancel();
    })
    .await
    .map_err(|err| format!("server error: {err}"))?;

    cancel.cancel();
    match bootstrap_task.await {
        Ok(report) => info!(
            ready = report.ready,
            attempts = report.attempts.len(),
            "bootstrap task finished"
        ),
        Err(err) => warn!("bootstrap task did not finish cleanly: {err}"),
    }
    Ok(())
}

async fn bootstrap_once(database: DatabaseArgs, bootstrap: BootstrapArgs) -> Result<(), String> {
    let store = Store::connect_lazy(&database.database_url, database.acquire_timeout())
        .map_err(|err| format!("failed to configure database pool: {err:#}"))?;

    let mut cfg = bootstrap.config();
    cfg.startup_delay = Duration::ZERO;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, abandoning bootstrap");
            on_signal.cancel();
        }
    });

    let report = Bootstrapper::new(Arc::new(store), cfg).run(cancel).await;
    if report.ready {
        if let Some(seed) = report.seed {
            info!(inserted = seed.inserted(), "database bootstrapped");
        }
        Ok(())
    } else {
        Err(format!(
            "database not ready after {} attempt(s)",
            report.attempts.len()
        ))
    }
}

async fn probe(url: String, timeout_secs: u64) -> Result<(), String> {
    let timeout = Duration::from_secs(timeout_secs);
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| format!("failed to build http client: {err}"))?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| format!("failed to query {url}: {err}"))?;

    if response.status().is_success() {
        info!("probe succeeded for {url} ({})", response.status());
        Ok(())
    } else {
        Err(format!(
            "probe failed for {url}: received status {}",
            response.status()
        ))
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => error!("failed to install ctrl-c handler: {err}"),
    }
}
