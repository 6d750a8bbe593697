//! JSON bodies of the bridge HTTP API.
//!
//! Request types list the fields each route requires. Missing fields that
//! have a documented default use `#[serde(default = ...)]`; everything else
//! is required and a decode failure is reported by the router as 404.

use serde::{Deserialize, Serialize};

use crate::midi::MidiValue;
use crate::{DEFAULT_BLE_NAME, DEFAULT_RTP_PORT};

// -- Requests --

/// `POST /midi1/send`
#[derive(Debug, Clone, Deserialize)]
pub struct SendMidi1Request {
    /// Raw MIDI 1.0 messages. Values outside 0–255 are dropped later.
    pub messages: Vec<Vec<MidiValue>>,
}

/// `POST /select-destination`
#[derive(Debug, Clone, Deserialize)]
pub struct SelectDestinationRequest {
    /// Case-insensitive substring of the destination name.
    pub name: String,
}

/// `POST /ble/advertise`
#[derive(Debug, Clone, Deserialize)]
pub struct BleAdvertiseRequest {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_ble_name")]
    pub name: String,
}

/// `POST /rtp/session`
#[derive(Debug, Clone, Deserialize)]
pub struct RtpSessionRequest {
    pub enable: bool,
}

/// `POST /rtp/connect`
#[derive(Debug, Clone, Deserialize)]
pub struct RtpConnectRequest {
    pub host: String,
    #[serde(default = "default_rtp_port")]
    pub port: u16,
}

fn default_true() -> bool { true }
fn default_ble_name() -> String { DEFAULT_BLE_NAME.to_string() }
fn default_rtp_port() -> u16 { DEFAULT_RTP_PORT }

// -- Responses --

/// `{"ok": bool}` acknowledgement used by most mutating routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const OK: Self = Self { ok: true };
    pub const FAILED: Self = Self { ok: false };
}

/// An addressable MIDI output endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Position in the platform enumeration (stable within one snapshot only)
    pub index: usize,
    pub name: String,
}

/// `POST /destinations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationList {
    pub items: Vec<Destination>,
}

/// `POST /ble/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleStatus {
    /// Radio is powered on
    pub enabled: bool,
    pub advertising: bool,
    pub name: String,
    /// Number of subscribed centrals
    pub subscribed: usize,
}

impl BleStatus {
    /// Status reported when the platform has no BLE capability.
    pub fn unsupported() -> Self {
        Self {
            enabled: false,
            advertising: false,
            name: String::new(),
            subscribed: 0,
        }
    }
}

/// Which peers may join the network session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPolicy {
    #[default]
    None,
    Anyone,
}

/// `GET /rtp/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpStatus {
    pub enabled: bool,
    pub network_name: String,
    pub local_name: String,
    pub connection_policy: ConnectionPolicy,
}

impl RtpStatus {
    /// Status reported when the platform has no network MIDI capability.
    pub fn unsupported() -> Self {
        Self {
            enabled: false,
            network_name: String::new(),
            local_name: String::new(),
            connection_policy: ConnectionPolicy::None,
        }
    }
}
