//! Framework-neutral HTTP surface.
//!
//! Every edge service ([`crate::IntakeHandler`], [`crate::TransitBroker`],
//! [`crate::SheetLogger`]) implements [`EdgeService`] over plain
//! [`InboundRequest`] and [`Reply`] values. The axum binding in
//! [`crate::server`] is the only code that touches framework types, so the
//! services can be driven directly from tests.
//!
//! # Request flow
//!
//! ```text
//! transport request
//!   -> InboundRequest          (body capped by the transport)
//!   -> ExtractMetadata         (request id, origin)
//!   -> ExtractTaintedBody      (Tainted<Bytes>)
//!   -> service routing         (OPTIONS, health, one POST route)
//!   -> Result<Reply, IntakeError>
//!   -> finalize                (security + CORS headers)
//! ```

mod adapter;
mod extract;
mod middleware;
mod reply;

use async_trait::async_trait;

use crate::error::IntakeError;
use crate::logging::RequestLog;

pub use adapter::{InboundRequest, RequestBody};
pub use extract::{bearer_token, read_json_body, ExtractMetadata, ExtractTaintedBody};
pub use middleware::{finalize, OriginPolicy};
pub use reply::Reply;

/// Health check route served by every edge service.
pub const HEALTH_PATH: &str = "/.well-known/health";

/// An HTTP edge service.
///
/// Implementations are stateless per request and shared across tasks.
#[async_trait]
pub trait EdgeService: Send + Sync {
    /// Service name used in logs and the health reply.
    fn name(&self) -> &str;

    /// Largest request body the service accepts. The transport stops reading
    /// past this and hands over [`RequestBody::Oversized`].
    fn max_body_bytes(&self) -> usize;

    /// Handles one request. Never fails; errors become error replies.
    async fn handle(&self, request: InboundRequest) -> Reply;
}

/// Turns a routing result into a reply, logging failures.
pub(crate) fn settle(result: Result<Reply, IntakeError>, log: &RequestLog<'_>) -> Reply {
    match result {
        Ok(reply) => reply,
        Err(err) if err.status().is_server_error() => {
            log.error(format_args!("request failed: {err}"));
            Reply::error(&err)
        }
        Err(err) => {
            log.warn(format_args!("request rejected: {}", err.code()));
            Reply::error(&err)
        }
    }
}
