use std::sync::Arc;
use std::time::Duration;

use insync_core::clock::DefaultClock;
use insync_db::store::{PgDirectory, PgNotificationStore};
use insync_events::{
    Deliverer, DispatchLoop, EmailConfig, EmailDelivery, EngineConfig, PushDelivery, RetryLoop,
    SmsConfig, SmsDelivery, Transports,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::WorkerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "insync_worker=debug,insync_events=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Engine configuration ---
    let engine = EngineConfig::from_env().expect("Invalid notification engine configuration");
    tracing::info!(
        dispatch_interval_secs = engine.dispatch_interval.as_secs(),
        retry_interval_secs = engine.retry_interval.as_secs(),
        batch_size = engine.batch_size,
        concurrency = engine.concurrency,
        max_attempts = engine.max_attempts,
        "Loaded engine configuration"
    );

    // --- Database ---
    let pool = insync_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    insync_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    insync_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Transports ---
    let email = EmailDelivery::new(EmailConfig::from_env()).expect("Invalid SMTP configuration");
    if !email.is_configured() {
        tracing::warn!("SMTP_HOST not set, email notifications will fail");
    }
    let sms = SmsDelivery::new(SmsConfig::from_env()).expect("Failed to build SMS HTTP client");
    if !sms.is_configured() {
        tracing::warn!("SMS provider not configured, SMS notifications will fail");
    }
    let transports = Transports {
        email: Arc::new(email),
        sms: Arc::new(sms),
        push: Arc::new(PushDelivery::new()),
    };

    // --- Loops ---
    let deliverer = Arc::new(Deliverer::new(
        Arc::new(PgNotificationStore::new(pool.clone())),
        Arc::new(PgDirectory::new(pool.clone())),
        transports,
        Arc::new(DefaultClock),
        &engine,
    ));

    let cancel = CancellationToken::new();

    let dispatch = DispatchLoop::new(Arc::clone(&deliverer), &engine);
    let dispatch_cancel = cancel.clone();
    let dispatch_handle = tokio::spawn(async move {
        dispatch.run(dispatch_cancel).await;
    });

    let retry = RetryLoop::new(Arc::clone(&deliverer), &engine);
    let retry_cancel = cancel.clone();
    let retry_handle = tokio::spawn(async move {
        retry.run(retry_cancel).await;
    });

    tracing::info!("Notification worker started (dispatch, retry)");

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(timeout, dispatch_handle).await;
    let _ = tokio::time::timeout(timeout, retry_handle).await;
    tracing::info!("Delivery loops stopped");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
