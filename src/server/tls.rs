//! TLS listener glue
//!
//! The bus client and TLS termination are both treated as external
//! collaborators by the system this bridge implements, but a runnable
//! binary still needs *something* to terminate HTTPS on. Grounded on the
//! accept-loop shape of a sibling crate in this pack that also serves an
//! axum `Router` over a manually-driven `rustls` listener: load PEM
//! material with `rustls-pemfile`, build a `rustls::ServerConfig`, accept
//! on a plain `TcpListener`, and hand each TLS-wrapped connection to
//! hyper via `hyper-util`'s tower-to-hyper adapter.

use crate::error::{BridgeError, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use hyper_util::service::TowerToHyperService;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

/// Load a PEM certificate chain from disk.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path)
        .map_err(|e| BridgeError::Tls(format!("failed to open cert file {}: {e}", path.display())))?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BridgeError::Tls(format!("failed to parse cert file {}: {e}", path.display())))
}

/// Load a PEM private key from disk (PKCS#8 or RSA, whichever
/// `rustls-pemfile` yields first).
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path)
        .map_err(|e| BridgeError::Tls(format!("failed to open key file {}: {e}", path.display())))?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| BridgeError::Tls(format!("failed to parse key file {}: {e}", path.display())))?
        .ok_or_else(|| BridgeError::Tls(format!("no private key found in {}", path.display())))
}

fn build_server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<Arc<rustls::ServerConfig>> {
    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| BridgeError::Tls(format!("invalid TLS certificate/key pair: {e}")))?;
    Ok(Arc::new(config))
}

/// Accept TLS connections on `addr`, serving `app` on each one, until
/// `shutdown` resolves. One task per connection; a slow or stalled
/// connection never blocks the accept loop.
pub async fn serve_tls(
    addr: std::net::SocketAddr,
    cert_path: &Path,
    key_path: &Path,
    app: axum::Router,
    mut shutdown: impl std::future::Future<Output = ()> + Unpin,
) -> Result<()> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    let server_config = build_server_config(certs, key)?;
    let acceptor = TlsAcceptor::from(server_config);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    tracing::info!(%addr, "Listening for TLS connections");

    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("TLS listener shutting down, draining in-flight connections");
                break;
            }
            accepted = listener.accept() => {
                let (tcp_stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::error!(error = %e, "TCP accept failed");
                        continue;
                    }
                };

                let acceptor = acceptor.clone();
                let app = app.clone();

                connections.spawn(async move {
                    let _ = tcp_stream.set_nodelay(true);
                    let tls_stream = match acceptor.accept(tcp_stream).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            tracing::error!(%peer_addr, error = %e, "TLS handshake failed");
                            return;
                        }
                    };

                    let hyper_svc = TowerToHyperService::new(app);
                    let io = TokioIo::new(tls_stream);
                    let builder = AutoBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(io, hyper_svc).await {
                        tracing::error!(%peer_addr, error = %e, "connection error");
                    }
                });
            }
        }
    }

    while connections.join_next().await.is_some() {}
    tracing::info!("All in-flight connections drained");

    Ok(())
}
