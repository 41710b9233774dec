//! Foody marketplace HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use foody_postgres::PostgresMarketStore;
use foody_server::config::Config;
use foody_server::{app_state, connect_pool, metrics, router_config};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "foody_server=info,foody_core=info,foody_postgres=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Foody marketplace server");

    let config = Config::from_env();
    info!(
        address = %config.server.address(),
        run_migrations = config.postgres.run_migrations,
        metrics_enabled = config.metrics.enabled,
        recovery_enabled = config.server.recovery_secret.is_some(),
        "Configuration loaded"
    );

    if config.metrics.enabled {
        let addr: SocketAddr = config.metrics.address().parse()?;
        metrics::install_exporter(addr)?;
        info!(address = %addr, "Prometheus exporter listening");
    }

    info!("Connecting to PostgreSQL...");
    let pool = connect_pool(&config.postgres).await?;
    let store = PostgresMarketStore::new(pool.clone());
    info!("PostgreSQL connected");

    if config.postgres.run_migrations {
        info!("Creating schema...");
        store.migrate().await?;
        info!("Schema ready");
    }

    let app = foody_web::router(app_state(store, &config), &router_config(&config));

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });
    let mut server = tokio::spawn(async move { server.await });

    let drain = Duration::from_secs(config.server.shutdown_timeout);
    tokio::select! {
        result = &mut server => result??,
        () = async {
            let _ = stop_rx.wait_for(|stopped| *stopped).await;
            tokio::time::sleep(drain).await;
        } => {
            warn!(
                timeout_secs = drain.as_secs(),
                "Graceful shutdown timed out, aborting open connections"
            );
            server.abort();
        }
    }

    pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
