//! # Health Check Module
//!
//! Minimal HTTP responder for hosting platform liveness probes. Every
//! request, whatever its method or path, is answered with `200 OK`.
//! Probe traffic is not logged.

use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::HealthConfig;

pub const HEALTH_BODY: &str = "OK";

/// Router answering any request with `200 OK`
pub fn health_router() -> Router {
    Router::new().fallback(health_handler)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, HEALTH_BODY)
}

/// Bind the health port and serve until the process exits
pub async fn run_health_check_server(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health check port {port}"))?;

    info!(port, "Health check server started");
    axum::serve(listener, health_router())
        .await
        .context("Health check server stopped")?;
    Ok(())
}

/// Start the health server in the background when the platform flag is set
///
/// Returns `None` without opening a socket when the flag is absent. The
/// returned handle is never awaited by the bot; failures are only logged.
pub fn maybe_spawn_health_server(config: &HealthConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        return None;
    }

    let port = config.port;
    Some(tokio::spawn(async move {
        if let Err(e) = run_health_check_server(port).await {
            error!(port, error = %e, "Health check server failed");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn probe(method: Method, uri: &str) -> (StatusCode, String) {
        let response = health_router()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_any_path_and_method_is_ok() {
        for (method, uri) in [
            (Method::GET, "/"),
            (Method::GET, "/health"),
            (Method::GET, "/some/deep/path?x=1"),
            (Method::HEAD, "/"),
            (Method::POST, "/"),
        ] {
            let (status, body) = probe(method.clone(), uri).await;
            assert_eq!(status, StatusCode::OK, "{method} {uri}");
            if method != Method::HEAD {
                assert_eq!(body, "OK", "{method} {uri}");
            }
        }
    }

    #[tokio::test]
    async fn test_not_spawned_without_platform_flag() {
        let config = HealthConfig {
            enabled: false,
            port: 0,
        };
        assert!(maybe_spawn_health_server(&config).is_none());
    }

    #[tokio::test]
    async fn test_bind_failure_does_not_propagate() {
        // Occupy a port so the server cannot bind it
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let handle = maybe_spawn_health_server(&HealthConfig { enabled: true, port }).unwrap();
        // The task ends after logging the error instead of panicking
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let handle = maybe_spawn_health_server(&HealthConfig { enabled: true, port }).unwrap();

        let mut body = None;
        for _ in 0..50 {
            if let Ok(resp) = reqwest::get(format!("http://127.0.0.1:{port}/anything")).await {
                assert_eq!(resp.status(), reqwest::StatusCode::OK);
                body = Some(resp.text().await.unwrap());
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(body.as_deref(), Some("OK"));
        handle.abort();
    }
}
