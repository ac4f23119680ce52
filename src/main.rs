use anyhow::Result;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tenant_audit::{
    application::ports::time::Clock,
    config::AppConfig,
    infrastructure::{
        audit::{AuditWriter, SqlAuditWriter, audit_interceptor},
        database::PoolRegistry,
        persistence::ContextFactory,
        tenancy::TenantCatalog,
        time::SystemClock,
    },
    presentation::http::{routes::build_router, state::HttpState},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Saves still running this long after a shutdown signal are cancelled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    if let Err(err) = bootstrap().await {
        tracing::error!(error = %err, "fatal error");
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn bootstrap() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let settings = config.tenant_settings()?;
    let catalog = Arc::new(TenantCatalog::from_settings(&settings)?);

    let registry = PoolRegistry::new(config.max_connections());
    // Connect and migrate the default database up front so a broken provider
    // stops startup instead of the first request.
    registry.pool_for(catalog.default_connection()).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let writer: Arc<dyn AuditWriter> = Arc::new(SqlAuditWriter);
    let factory = Arc::new(
        ContextFactory::new(registry.clone())
            .with_interceptor(Arc::new(audit_interceptor(clock, writer))),
    );

    let shutdown = CancellationToken::new();
    let state = HttpState::new(factory, catalog, shutdown.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    let address: SocketAddr = listener.local_addr()?;
    tracing::info!("listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    registry.close_all().await;
    Ok(())
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .unwrap_or_else(|| "info,sqlx=warn".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer());

    if subscriber.try_init().is_err() {
        tracing::warn!("tracing subscriber already initialised");
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");

    tokio::spawn(async move {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        tracing::warn!("grace period elapsed; cancelling in-flight saves");
        shutdown.cancel();
    });
}
