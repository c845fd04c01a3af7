use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use dnswatch_api::{create_api_routes, AppState};
use dnswatch_application::ports::JobSchedulerPort;
use dnswatch_application::use_cases::{IntakeEmailRequestUseCase, QueryDnsStatusUseCase, RunCheckUseCase};
use dnswatch_application::{ReadOnlyDebounce, ValidationEngine};
use dnswatch_domain::config::{CliOverrides, Config};
use dnswatch_infrastructure::{create_pool, HickoryResolverFacade, SmtpMailer, SqliteRequestStore};
use dnswatch_jobs::Scheduler;

#[derive(Parser)]
#[command(name = "dnswatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DNS ownership verification service")]
struct Cli {
    /// HTTP bind port (overrides PORT)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// HTTP bind host (overrides HOST)
    #[arg(short = 'b', long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        port: cli.port,
        host: cli.host.clone(),
    };

    let config = Config::from_env(overrides)?;
    config.validate()?;

    info!(
        bind = %config.server.host,
        port = config.server.port,
        "configuration loaded"
    );

    let database_url = format!("sqlite:{}", config.database.name);
    let pool = create_pool(&database_url, &config.database).await.map_err(|e| {
        error!(error = %e, "failed to initialize database");
        e
    })?;
    info!("database initialized");

    let store = Arc::new(SqliteRequestStore::new(
        pool,
        config.database.query_retry_count,
        config.database.query_retry_delay_ms,
    ));

    let resolver = Arc::new(HickoryResolverFacade::new(&config.dns.servers, config.dns.timeout_ms));

    let validation = Arc::new(ValidationEngine::new(
        resolver,
        config.cname.clone(),
        config.email.clone(),
        config.dns.clone(),
    ));

    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    let shutdown = CancellationToken::new();

    let run_check = Arc::new(RunCheckUseCase::new(
        store.clone(),
        validation.clone(),
        mailer.clone(),
        config.dns.poll_interval_secs,
        config.limits.result_json_max_bytes,
    ));

    let max_active_jobs = config.effective_max_active_jobs();
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        run_check.clone(),
        max_active_jobs,
        config.dns.poll_interval_secs,
        config.limits.resume_startup_jitter_ms,
        shutdown.clone(),
    ));

    let intake = Arc::new(IntakeEmailRequestUseCase::new(
        store.clone(),
        mailer,
        scheduler.clone() as Arc<dyn JobSchedulerPort>,
        run_check,
        config.dns.job_max_age_hours,
        config.limits.target_cooldown_secs,
    ));

    let debounce = Arc::new(ReadOnlyDebounce::new());
    let query = Arc::new(QueryDnsStatusUseCase::new(
        store,
        validation,
        debounce,
        config.cname.clone(),
        config.email.clone(),
        config.limits.checkdns_min_interval_secs,
    ));

    info!("resuming pending verification jobs");
    scheduler.resume().await;

    let state = AppState {
        intake,
        query,
        checkdns_token: config.limits.checkdns_token.clone().map(Arc::from),
        rate_limiter: Arc::new(dnswatch_api::middleware::RateLimiter::new()),
        started_at: Arc::new(Instant::now()),
    };

    let app = create_api_routes(state);

    let bind_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received, draining active jobs");
            server_shutdown.cancel();
        })
        .await?;

    drain_active_jobs(scheduler.as_ref(), Duration::from_secs(10)).await;

    info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn drain_active_jobs(scheduler: &Scheduler, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while scheduler.active_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if scheduler.active_count() > 0 {
        error!(remaining = scheduler.active_count(), "forcing exit with jobs still active");
    }
}
