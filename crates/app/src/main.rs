use std::time::Duration;

use migration::MigratorTrait;
use sea_orm::ConnectOptions;

use engine::{Reconciler, ReconcilerConfig};
use server::{RateLimiter, TokenManager};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "florin={level},server={level},engine={level},migration={level}",
            level = settings.log.level
        ))
        .init();

    if settings.auth.uses_default_secret() {
        tracing::warn!("using the default JWT secret; set FLORIN__AUTH__JWT_SECRET");
    }

    let db = connect_database(&settings.database).await?;

    let engine = engine::Engine::builder()
        .database(db.clone())
        .usd_to_eur_rate(&settings.exchange_rate_usd_to_eur)
        .build()
        .await?;

    let reconciler = if settings.reconciler.enabled {
        Some(Reconciler::spawn(
            engine.clone(),
            ReconcilerConfig {
                interval: Duration::from_secs(settings.reconciler.interval_seconds),
                check_timeout: Duration::from_secs(settings.reconciler.timeout_seconds),
            },
        ))
    } else {
        tracing::info!("reconciler disabled");
        None
    };

    let tokens = TokenManager::new(
        &settings.auth.jwt_secret,
        settings.auth.access_ttl_seconds,
        settings.auth.refresh_ttl_seconds,
    );
    let rate_limiter = settings
        .rate_limit
        .enabled
        .then(|| RateLimiter::new(settings.rate_limit.rps, settings.rate_limit.burst));

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Stop accepting on the first signal; in-flight requests then get
    // `shutdown_timeout_seconds` to drain before the server task is aborted.
    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let graceful = async move {
        shutdown_signal().await;
        let _ = signal_tx.send(());
    };
    let mut server_task = tokio::spawn(server::run_with_listener(
        engine,
        tokens,
        rate_limiter,
        listener,
        graceful,
    ));

    // Resolves on the signal, or early (with an error) if the server dies
    // first and drops the sender.
    let _ = signal_rx.await;

    let drain = Duration::from_secs(settings.shutdown_timeout_seconds);
    match tokio::time::timeout(drain, &mut server_task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => tracing::error!("server task failed: {join_err}"),
        Err(_) => {
            tracing::warn!("shutdown timeout reached; dropping in-flight requests");
            server_task.abort();
        }
    }

    if let Some(reconciler) = reconciler {
        reconciler
            .stop(Duration::from_secs(settings.reconciler.stop_timeout_seconds))
            .await;
    }

    db.close().await?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let mut options = ConnectOptions::new(config.url());
    options
        .max_connections(25)
        .min_connections(5)
        .sqlx_logging(false);

    let db = sea_orm::Database::connect(options).await?;
    db.ping().await?;

    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("failed to listen for SIGTERM: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
