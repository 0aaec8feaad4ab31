//! Reference delivery receiver (spec §6: "a small reference 'delivery
//! receiver' is specified ... as the counterpart that the bridge POSTs
//! to, because the end-to-end tests depend on it").
//!
//! Accepts any POST carrying `Content-Type: application/json` and
//! returns `200`. Not part of the bridge core.

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "delivery-receiver", version, about)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 7076)]
    port: u16,
}

async fn receive(headers: HeaderMap, body: axum::body::Bytes) -> StatusCode {
    let content_type_ok = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if !content_type_ok {
        return StatusCode::BAD_REQUEST;
    }

    if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
        return StatusCode::BAD_REQUEST;
    }

    StatusCode::OK
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let app = Router::new().route("/delivery", post(receive));
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!(%addr, "delivery-receiver listening");
    axum::serve(listener, app).await.unwrap();
}
