use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway::cli::{Cli, Commands};
use gateway::config::{self, Config, LogFormat};
use gateway::middleware::rbac::Role;
use gateway::middleware::token::TokenService;
use gateway::store::HttpObjectStore;
use gateway::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(config::log_format_from_env());

    let args = Cli::parse();
    let cfg = config::load().map_err(|e| {
        tracing::error!("error loading configuration: {:#}", e);
        e
    })?;

    let result = match args.command {
        Some(Commands::Serve { port }) => run_server(cfg, port).await,
        Some(Commands::Token { role }) => print_token(&cfg, role),
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        tracing::error!("fatal: {:#}", e);
    }
    result
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "objgate=debug,gateway=debug,tower_http=info".into()),
    );
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(cfg.port);
    let grace = cfg.shutdown_grace;

    let store = HttpObjectStore::new(cfg.base_api_url.clone())
        .context("failed to build upstream HTTP client")?;
    tracing::info!(upstream = %cfg.base_api_url, "upstream client ready");

    let state = Arc::new(AppState::new(cfg, Arc::new(store)));
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("objgate listening on {}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        res = &mut server => {
            return res.context("server task panicked")?.map_err(Into::into);
        }
        _ = shutdown_signal() => {}
    }

    // Stop accepting, then give in-flight requests the grace period to drain.
    let _ = stop_tx.send(());
    match tokio::time::timeout(grace, &mut server).await {
        Ok(res) => res.context("server task panicked")??,
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish in time, forcing shutdown"
            );
            server.abort();
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn print_token(cfg: &Config, role: Role) -> anyhow::Result<()> {
    let token = TokenService::new(cfg.auth_secret_key.clone())
        .issue(role)
        .context("failed to sign token")?;
    println!("{}", token);
    Ok(())
}

/// Handles graceful shutdown signals.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown...");
        }
    }
}
