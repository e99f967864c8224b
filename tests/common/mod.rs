#![allow(dead_code)]

use axum::{routing::post, Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use severity_relay::config::RelayConfig;

/// Serves `app` on an ephemeral local port and returns its address.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn config_for(addr: SocketAddr, timeout_ms: u64) -> RelayConfig {
    RelayConfig {
        model_server_url: format!("http://{}", addr),
        timeout_ms,
        ..RelayConfig::default()
    }
}

/// Upstream that answers every prediction with `body`.
pub fn fixed(body: Value) -> Router {
    Router::new().route(
        "/predict",
        post(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    )
}

/// Upstream that returns its request body.
pub fn echo() -> Router {
    Router::new().route("/predict", post(|Json(v): Json<Value>| async move { Json(v) }))
}
