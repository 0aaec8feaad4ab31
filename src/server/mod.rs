pub mod handler;
pub mod router;
pub mod state;
pub mod tls;

use crate::config::BridgeConfig;
use crate::error::Result;
use state::AppState;

/// Start the HTTPS server with the given configuration and shared state.
///
/// Blocks until `shutdown` resolves (spec §4.5 "graceful shutdown: on
/// SIGINT, stop accepting, drain in-flight requests").
pub async fn start(
    config: &BridgeConfig,
    app_state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Unpin,
) -> Result<()> {
    let addr: std::net::SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| crate::error::BridgeError::Config(format!("invalid bind address: {e}")))?;

    let app = router::build(app_state);

    tls::serve_tls(addr, &config.tls_cert, &config.tls_key, app, shutdown).await
}
