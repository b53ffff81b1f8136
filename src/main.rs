use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use salon_api::config::{init_tracing, load_config};
use salon_api::gateway::PesapalClient;
use salon_api::{app, db, events, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "starting salon-api {}",
        env!("CARGO_PKG_VERSION")
    );

    let db = Arc::new(
        db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?,
    );

    if config.auto_migrate {
        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;
    }

    if config.pesapal.consumer_key.is_empty() {
        warn!("Pesapal consumer key is not configured; payment initiation will fail");
    }

    let (event_sender, event_receiver) = events::event_channel(config.event_channel_capacity);
    let event_db = db.clone();
    let event_task = tokio::spawn(events::process_events(event_receiver, event_db));

    let gateway = Arc::new(PesapalClient::new(config.pesapal.clone()));
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db, Arc::new(config), gateway, event_sender);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The state (and with it the last event sender) is dropped once serve
    // returns, letting the processor drain and exit.
    if let Err(err) = event_task.await {
        warn!(error = %err, "event processor ended abnormally");
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received terminate signal"),
    }
}
