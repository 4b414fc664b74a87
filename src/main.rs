//! Callcache demo server
//!
//! Serves the cache admin API next to a cached demo computation, so the
//! admin endpoints have something to report on.
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load configuration from environment variables
//! 3. Wrap the demo computation with a cache
//! 4. Create Axum router with admin and demo endpoints
//! 5. Start HTTP server on configured port
//! 6. Handle graceful shutdown on SIGINT/SIGTERM

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Path, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callcache::{api::create_router, AppState, CacheBuilder, CacheError, CallArgs, Config};

/// Naive Fibonacci, slow on purpose so cache hits are visible.
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting callcache demo server");

    let config = Config::global();
    info!(
        "Configuration loaded: enabled={}, hash_memo_capacity={}, port={}",
        config.enabled, config.hash_memo_capacity, config.server_port
    );

    let fib = Arc::new(
        CacheBuilder::new("fibonacci")
            .max_size(1024)
            .ttl(Duration::from_secs(300))
            .wrap_function(|args: CallArgs| async move {
                let n: u64 = args.arg_as(0)?;
                if n > 40 {
                    anyhow::bail!("n must be at most 40, got {}", n);
                }
                let value = tokio::task::spawn_blocking(move || fibonacci(n)).await?;
                Ok(value)
            }),
    );

    let demo = Router::new().route(
        "/fib/:n",
        get(move |Path(n): Path<u64>| {
            let fib = Arc::clone(&fib);
            async move {
                let (value, outcome) = fib.invoke_traced(CallArgs::new().arg(n)).await?;
                Ok::<Json<Value>, CacheError>(Json(json!({
                    "n": n,
                    "value": value,
                    "outcome": outcome,
                })))
            }
        }),
    );

    let app = create_router(AppState::global()).merge(demo);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
