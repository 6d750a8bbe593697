//! Request aggregation: reassembles one request from the head / body-chunk /
//! end events produced by the HTTP framing layer.
//!
//! One request is in flight at a time. `GET /health` is answered straight
//! from the head without buffering; every other head opens a body buffer
//! that grows without a cap until `End`, when the buffered request is
//! routed and the aggregator returns to idle.

use axum::http::Method;
use tracing::trace;

use crate::router::{Reply, Router};

/// One framing event of an HTTP request.
#[derive(Debug)]
pub enum RequestPart<'a> {
    Head { method: Method, path: String },
    Body(&'a [u8]),
    End,
}

enum Pending {
    Idle,
    /// Already answered from the head; remaining events are ignored
    Answered,
    Buffering {
        method: Method,
        path: String,
        body: Vec<u8>,
    },
}

pub struct RequestAggregator<'r> {
    router: &'r Router,
    pending: Pending,
}

impl<'r> RequestAggregator<'r> {
    pub fn new(router: &'r Router) -> Self {
        Self {
            router,
            pending: Pending::Idle,
        }
    }

    /// Feed one event. Returns the reply once the request is complete, or
    /// immediately for the health fast path.
    pub fn feed(&mut self, part: RequestPart<'_>) -> Option<Reply> {
        match part {
            RequestPart::Head { method, path } => {
                if method == Method::GET && path == "/health" {
                    self.pending = Pending::Answered;
                    return Some(Reply::health());
                }
                self.pending = Pending::Buffering {
                    method,
                    path,
                    body: Vec::new(),
                };
                None
            }
            RequestPart::Body(chunk) => {
                if let Pending::Buffering { body, .. } = &mut self.pending {
                    body.extend_from_slice(chunk);
                } else {
                    trace!(bytes = chunk.len(), "Body chunk without an open request");
                }
                None
            }
            RequestPart::End => match std::mem::replace(&mut self.pending, Pending::Idle) {
                Pending::Buffering { method, path, body } => {
                    Some(self.router.handle(&method, &path, &body))
                }
                Pending::Answered => None,
                Pending::Idle => Some(Reply::not_found()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use fountain_device::platform::unsupported::{UnsupportedBle, UnsupportedMidi, UnsupportedNetwork};

    use crate::ble_session::BleSession;
    use crate::state::BridgeServices;

    fn router() -> Router {
        let ble = Arc::new(BleSession::new(Box::new(UnsupportedBle)));
        let services = BridgeServices::new(Arc::new(UnsupportedMidi), ble, Box::new(UnsupportedNetwork));
        Router::new(Arc::new(services))
    }

    fn head(method: Method, path: &str) -> RequestPart<'static> {
        RequestPart::Head {
            method,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_health_answered_from_head() {
        let router = router();
        let mut agg = RequestAggregator::new(&router);

        let reply = agg.feed(head(Method::GET, "/health")).unwrap();
        assert_eq!(reply.body, "ok");
        assert!(agg.feed(RequestPart::Body(b"ignored")).is_none());
        assert!(agg.feed(RequestPart::End).is_none());
    }

    #[test]
    fn test_body_reassembled_across_chunks() {
        let router = router();
        let mut agg = RequestAggregator::new(&router);

        assert!(agg.feed(head(Method::POST, "/destinations")).is_none());
        assert!(agg.feed(RequestPart::Body(b"{")).is_none());
        assert!(agg.feed(RequestPart::Body(b"}")).is_none());

        let reply = agg.feed(RequestPart::End).unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, r#"{"items":[]}"#);
        // Back to idle: a stray end is answered as an unknown request.
        assert_eq!(agg.feed(RequestPart::End), Some(Reply::not_found()));
    }

    #[test]
    fn test_split_json_is_not_decoded_early() {
        let router = router();
        let mut agg = RequestAggregator::new(&router);

        agg.feed(head(Method::POST, "/rtp/connect"));
        agg.feed(RequestPart::Body(br#"{"host":"stu"#));
        agg.feed(RequestPart::Body(br#"dio","port":5004}"#));
        // Network MIDI is unsupported here, so a well-formed body is a 400.
        let reply = agg.feed(RequestPart::End).unwrap();
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_end_without_head_is_not_found() {
        let router = router();
        let mut agg = RequestAggregator::new(&router);
        assert_eq!(agg.feed(RequestPart::End), Some(Reply::not_found()));
    }

    #[test]
    fn test_reset_between_requests() {
        let router = router();
        let mut agg = RequestAggregator::new(&router);

        agg.feed(head(Method::POST, "/nope"));
        agg.feed(RequestPart::Body(b"{}"));
        assert_eq!(agg.feed(RequestPart::End).unwrap().status, StatusCode::NOT_FOUND);

        agg.feed(head(Method::POST, "/destinations"));
        assert_eq!(agg.feed(RequestPart::End).unwrap().status, StatusCode::OK);
    }
}
