use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::metrics_handler::{handle_metrics, health_check_response, plain_response, RespBody};
use crate::error::Result;

/// Bind `0.0.0.0:port` and serve observability endpoints until `shutdown` flips to true:
/// - `/metrics` - Prometheus metrics
/// - `/health`, `/live` - liveness
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    serve_observability(listener, registry, shutdown).await
}

/// Serve observability endpoints on an already bound listener.
pub async fn serve_observability(
    listener: TcpListener,
    registry: Registry,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let registry = Arc::new(registry);
    let addr = listener.local_addr()?;
    info!(%addr, "observability server listening");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "observability accept failed");
                        continue;
                    }
                };
                let registry = registry.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let resp = route(req.uri().path(), &registry);
                        async move { Ok::<_, hyper::Error>(resp) }
                    });
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        debug!(%peer, error = %e, "observability connection closed with error");
                    }
                });
            }
        }
    }

    info!(%addr, "observability server stopped");
    Ok(())
}

fn route(path: &str, registry: &Registry) -> Response<RespBody> {
    let resp = match path {
        "/health" | "/live" => health_check_response(),
        "/metrics" => handle_metrics(registry),
        _ => return plain_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    resp.unwrap_or_else(|e| {
        warn!(path, error = %e, "observability handler failed");
        plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}
