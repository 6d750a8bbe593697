//! HTTP front end of the bridge.
//!
//! axum/hyper own the connection and the HTTP/1 framing. Every request is
//! handed to one fallback handler that replays it as head / body-chunk /
//! end events into a [`RequestAggregator`], so routing never sees a
//! partially received body.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::aggregator::{RequestAggregator, RequestPart};
use crate::router::{Reply, Router};

#[derive(Clone)]
struct ServerState {
    router: Arc<Router>,
}

/// Build the axum application around the bridge router.
pub fn build_app(router: Arc<Router>) -> axum::Router {
    axum::Router::new()
        .fallback(handle_request)
        .with_state(ServerState { router })
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Arc<Router>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Bridge listening");

    axum::serve(listener, build_app(router))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Bridge stopped");
    Ok(())
}

async fn handle_request(State(state): State<ServerState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let mut aggregator = RequestAggregator::new(&state.router);

    let head = RequestPart::Head {
        method: parts.method,
        path: parts.uri.path().to_string(),
    };
    if let Some(reply) = aggregator.feed(head) {
        return reply.into_response();
    }

    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                aggregator.feed(RequestPart::Body(&bytes[..]));
            }
            Err(e) => {
                debug!(error = %e, "Request body stream failed");
                return Reply::text(StatusCode::BAD_REQUEST, "bad request").into_response();
            }
        }
    }

    aggregator
        .feed(RequestPart::End)
        .unwrap_or_else(Reply::not_found)
        .into_response()
}
