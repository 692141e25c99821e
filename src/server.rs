//! Health endpoint and shutdown signal for the long-running worker

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Serve `/health` on `address` until `shutdown` resolves.
pub async fn run<F>(address: SocketAddr, shutdown: F) -> Result<(), AnyError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(address).await?;
    info!(%address, "Health server listening");

    axum::serve(listener, router().into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
