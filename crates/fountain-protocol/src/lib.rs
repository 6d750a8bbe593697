pub mod api;
pub mod applemidi;
pub mod ble;
pub mod midi;

/// Default HTTP port of the bridge (overridable via `BRIDGE_PORT`).
pub const DEFAULT_BRIDGE_PORT: u16 = 18090;

/// Default listen host. The bridge is a local-only service.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Default AppleMIDI control port used by `/rtp/connect` when no port is given.
pub const DEFAULT_RTP_PORT: u16 = 5004;

/// Advertised name of the BLE peripheral when a request does not name one.
pub const DEFAULT_BLE_NAME: &str = "Fountain MIDI";

/// Client name registered with the platform MIDI subsystem.
pub const DEFAULT_MIDI_CLIENT_NAME: &str = "FountainCoreMIDIBridge";

/// Network MIDI session name announced to peers.
pub const DEFAULT_RTP_SESSION_NAME: &str = "Fountain MIDI";
