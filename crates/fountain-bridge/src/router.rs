//! Route table of the bridge API.
//!
//!   GET  /health              plain-text liveness probe
//!   POST /midi1/send          forward MIDI 1.0 messages to active transports
//!   POST /destinations        list MIDI output destinations
//!   POST /select-destination  select the device output by name substring
//!   POST /ble/advertise       start/stop the BLE MIDI peripheral
//!   POST /ble/status          BLE peripheral status
//!   GET  /rtp/status          network session status
//!   POST /rtp/session         enable/disable the network session
//!   POST /rtp/connect         invite a network peer
//!
//! Bodies are JSON objects. A body that doesn't decode, or lacks a required
//! field, gets the same 404 `not found` as an unknown route.

use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use fountain_protocol::api::{
    BleAdvertiseRequest, BleStatus, DestinationList, OkResponse, RtpConnectRequest,
    RtpSessionRequest, SelectDestinationRequest, SendMidi1Request,
};

use crate::state::BridgeServices;

const TEXT_PLAIN: &str = "text/plain";
const APPLICATION_JSON: &str = "application/json";

/// A fully rendered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.to_string(),
        }
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: APPLICATION_JSON,
                body,
            },
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                Self::text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }

    pub fn health() -> Self {
        Self::text(StatusCode::OK, "ok")
    }

    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "not found")
    }

    fn ok(ok: bool) -> Self {
        Self::json(StatusCode::OK, &OkResponse { ok })
    }

    fn failed(status: StatusCode) -> Self {
        Self::json(status, &OkResponse::FAILED)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

pub struct Router {
    services: Arc<BridgeServices>,
}

impl Router {
    pub fn new(services: Arc<BridgeServices>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &BridgeServices {
        &self.services
    }

    /// Route one complete request.
    pub fn handle(&self, method: &Method, path: &str, body: &[u8]) -> Reply {
        let reply = self.route(method, path, body).unwrap_or_else(Reply::not_found);
        debug!(%method, path, status = reply.status.as_u16(), "Handled request");
        reply
    }

    fn route(&self, method: &Method, path: &str, body: &[u8]) -> Option<Reply> {
        if *method == Method::GET && path == "/health" {
            return Some(Reply::health());
        }

        let body = decode_object(body)?;
        match (method.as_str(), path) {
            ("POST", "/midi1/send") => Some(self.send_midi1(decode(body)?)),
            ("POST", "/destinations") => Some(self.destinations()),
            ("POST", "/select-destination") => Some(self.select_destination(decode(body)?)),
            ("POST", "/ble/advertise") => Some(self.ble_advertise(decode(body)?)),
            ("POST", "/ble/status") => Some(self.ble_status()),
            ("GET", "/rtp/status") => Some(self.rtp_status()),
            ("POST", "/rtp/session") => Some(self.rtp_session(decode(body)?)),
            ("POST", "/rtp/connect") => Some(self.rtp_connect(decode(body)?)),
            _ => None,
        }
    }

    // ── MIDI ────────────────────────────────────────────────────────────

    fn send_midi1(&self, req: SendMidi1Request) -> Reply {
        let forwarded = self.services.dispatcher.send_midi1(&req.messages);
        info!(msgs = req.messages.len(), forwarded, "midi1 batch");
        Reply::ok(true)
    }

    fn destinations(&self) -> Reply {
        let items = self.services.registry.list();
        Reply::json(StatusCode::OK, &DestinationList { items })
    }

    fn select_destination(&self, req: SelectDestinationRequest) -> Reply {
        match self.services.registry.select(&req.name) {
            Some(dest) => {
                self.services.dispatcher.select(dest);
                Reply::ok(true)
            }
            None => {
                debug!(name = %req.name, "No destination matches");
                Reply::failed(StatusCode::NOT_FOUND)
            }
        }
    }

    // ── BLE ─────────────────────────────────────────────────────────────

    fn ble_advertise(&self, req: BleAdvertiseRequest) -> Reply {
        let ble = &self.services.ble;
        if !ble.supported() {
            return Reply::ok(false);
        }

        if req.enable {
            Reply::ok(ble.start(&req.name))
        } else {
            ble.stop();
            Reply::ok(true)
        }
    }

    fn ble_status(&self) -> Reply {
        let ble = &self.services.ble;
        let status = if ble.supported() {
            ble.status()
        } else {
            BleStatus::unsupported()
        };
        Reply::json(StatusCode::OK, &status)
    }

    // ── RTP-MIDI ────────────────────────────────────────────────────────

    fn rtp_status(&self) -> Reply {
        Reply::json(StatusCode::OK, &self.services.rtp.status())
    }

    fn rtp_session(&self, req: RtpSessionRequest) -> Reply {
        match self.services.rtp.set_enabled(req.enable) {
            Ok(_) => Reply::ok(true),
            Err(e) => {
                warn!(error = %e, enable = req.enable, "Network session toggle rejected");
                Reply::failed(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn rtp_connect(&self, req: RtpConnectRequest) -> Reply {
        if self.services.rtp.connect(&req.host, req.port) {
            Reply::ok(true)
        } else {
            Reply::failed(StatusCode::BAD_REQUEST)
        }
    }
}

/// Parse a request body as a JSON object. An empty body counts as `{}`.
fn decode_object(body: &[u8]) -> Option<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Some(Map::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Request body is not JSON");
            None
        }
    }
}

fn decode<T: DeserializeOwned>(body: Map<String, Value>) -> Option<T> {
    serde_json::from_value(Value::Object(body))
        .map_err(|e| debug!(error = %e, "Request body missing required fields"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble_session::BleSession;
    use fountain_device::platform::unsupported::{UnsupportedBle, UnsupportedMidi, UnsupportedNetwork};

    fn router() -> Router {
        let ble = Arc::new(BleSession::new(Box::new(UnsupportedBle)));
        let services = BridgeServices::new(Arc::new(UnsupportedMidi), ble, Box::new(UnsupportedNetwork));
        Router::new(Arc::new(services))
    }

    #[test]
    fn test_unknown_route() {
        let reply = router().handle(&Method::POST, "/nope", b"{}");
        assert_eq!(reply, Reply::not_found());
    }

    #[test]
    fn test_wrong_method_is_not_found() {
        let reply = router().handle(&Method::GET, "/midi1/send", br#"{"messages":[]}"#);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_malformed_json_is_not_found() {
        let reply = router().handle(&Method::POST, "/destinations", b"{not json");
        assert_eq!(reply, Reply::not_found());
    }

    #[test]
    fn test_non_object_json_is_not_found() {
        let reply = router().handle(&Method::POST, "/destinations", b"[1,2]");
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_missing_field_is_not_found() {
        let reply = router().handle(&Method::POST, "/midi1/send", b"{}");
        assert_eq!(reply, Reply::not_found());
    }

    #[test]
    fn test_unsupported_platform_defaults() {
        let r = router();

        let reply = r.handle(&Method::POST, "/destinations", b"{}");
        assert_eq!(reply.body, r#"{"items":[]}"#);
        assert_eq!(reply.content_type, "application/json");

        let reply = r.handle(&Method::POST, "/ble/advertise", b"{}");
        assert_eq!((reply.status, reply.body.as_str()), (StatusCode::OK, r#"{"ok":false}"#));

        let reply = r.handle(&Method::POST, "/ble/status", b"");
        assert_eq!(
            reply.body,
            r#"{"enabled":false,"advertising":false,"name":"","subscribed":0}"#
        );

        let reply = r.handle(&Method::GET, "/rtp/status", b"");
        assert_eq!(
            reply.body,
            r#"{"enabled":false,"networkName":"","localName":"","connectionPolicy":"none"}"#
        );

        let reply = r.handle(&Method::POST, "/rtp/session", br#"{"enable":true}"#);
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_health_is_plain_text() {
        let reply = router().handle(&Method::GET, "/health", b"");
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, "text/plain");
        assert_eq!(reply.body, "ok");
    }
}
