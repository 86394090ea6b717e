//! axum binding for [`EdgeService`].
//!
//! Every route goes to one fallback handler that converts the request into
//! an [`InboundRequest`], so routing stays inside the service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::web::{EdgeService, InboundRequest, Reply, RequestBody};

#[derive(Clone)]
struct AppState {
    service: Arc<dyn EdgeService>,
}

/// Builds the router for one service.
pub fn router(service: Arc<dyn EdgeService>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Binds `addr` and serves until ctrl-c or SIGTERM.
pub async fn serve(service: Arc<dyn EdgeService>, addr: SocketAddr) -> std::io::Result<()> {
    let name = service.name().to_string();
    let listener = TcpListener::bind(addr).await?;
    info!("{name} listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{name} shut down");
    Ok(())
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let limit = state.service.max_body_bytes();

    let body = if declared_length(&parts.headers).is_some_and(|len| len > limit as u64) {
        RequestBody::Oversized
    } else {
        // A read error is either the cap or a client that already hung up.
        match to_bytes(body, limit).await {
            Ok(bytes) => RequestBody::Complete(bytes),
            Err(_) => RequestBody::Oversized,
        }
    };

    let inbound = InboundRequest::from_parts(parts.method, parts.uri.path(), parts.headers, body);
    into_response(state.service.handle(inbound).await)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn into_response(reply: Reply) -> Response {
    let (status, headers, body) = reply.into_parts();
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
