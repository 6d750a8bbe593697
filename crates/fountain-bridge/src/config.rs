//! Bridge configuration.
//!
//! Every section is optional; a missing config file means all defaults.
//! Command-line flags and `BRIDGE_PORT` override the file.
//!
//! ```toml
//! [server]
//! listen_host = "127.0.0.1"
//! port = 18090
//!
//! [midi]
//! client_name = "FountainCoreMIDIBridge"
//!
//! [ble]
//! advertise_on_start = false
//! name = "Fountain MIDI"
//!
//! [rtp]
//! enabled = true
//! session_name = "Fountain MIDI"
//! control_port = 5004
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use fountain_protocol::{
    DEFAULT_BLE_NAME, DEFAULT_BRIDGE_PORT, DEFAULT_LISTEN_HOST, DEFAULT_MIDI_CLIENT_NAME, DEFAULT_RTP_PORT,
    DEFAULT_RTP_SESSION_NAME,
};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub midi: MidiSection,
    #[serde(default)]
    pub ble: BleSection,
    #[serde(default)]
    pub rtp: RtpSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MidiSection {
    /// Client name shown by the platform MIDI subsystem
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl Default for MidiSection {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BleSection {
    /// Request advertising as soon as the bridge starts
    #[serde(default)]
    pub advertise_on_start: bool,
    #[serde(default = "default_ble_name")]
    pub name: String,
}

impl Default for BleSection {
    fn default() -> Self {
        Self {
            advertise_on_start: false,
            name: default_ble_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RtpSection {
    /// When false the network MIDI capability is reported as unsupported
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default = "default_local_name")]
    pub local_name: String,
    /// UDP control port bound while the session is enabled
    #[serde(default = "default_control_port")]
    pub control_port: u16,
}

impl Default for RtpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            session_name: default_session_name(),
            local_name: default_local_name(),
            control_port: default_control_port(),
        }
    }
}

// Default value functions
fn default_listen_host() -> String { DEFAULT_LISTEN_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_BRIDGE_PORT }
fn default_client_name() -> String { DEFAULT_MIDI_CLIENT_NAME.to_string() }
fn default_ble_name() -> String { DEFAULT_BLE_NAME.to_string() }
fn default_true() -> bool { true }
fn default_session_name() -> String { DEFAULT_RTP_SESSION_NAME.to_string() }
fn default_control_port() -> u16 { DEFAULT_RTP_PORT }
fn default_local_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

impl BridgeConfig {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Apply command-line / environment overrides.
    pub fn with_overrides(mut self, listen_host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = listen_host {
            self.server.listen_host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Resolve the listen host. Accepts IPv4, bare IPv6 (`::1`) and names
    /// such as `localhost`; the first resolved address wins.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.server.listen_host.as_str();
        (host, self.server.port)
            .to_socket_addrs()
            .map_err(|e| anyhow::anyhow!("Invalid listen host '{}': {}", host, e))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("Listen host '{}' resolved to no address", host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.listen_addr().unwrap().to_string(), "127.0.0.1:18090");
        assert_eq!(config.midi.client_name, "FountainCoreMIDIBridge");
        assert!(config.rtp.enabled);
        assert_eq!(config.rtp.control_port, 5004);
    }

    #[test]
    fn test_partial_sections() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [ble]
            advertise_on_start = true

            [rtp]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.listen_host, "127.0.0.1");
        assert!(config.ble.advertise_on_start);
        assert_eq!(config.ble.name, "Fountain MIDI");
        assert!(!config.rtp.enabled);
        assert_eq!(config.rtp.session_name, "Fountain MIDI");
    }

    #[test]
    fn test_overrides_win() {
        let config = BridgeConfig::default().with_overrides(Some("0.0.0.0".into()), Some(18100));
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:18100");
    }

    #[test]
    fn test_ipv6_and_named_hosts() {
        let config = BridgeConfig::default().with_overrides(Some("::1".into()), Some(18100));
        assert_eq!(config.listen_addr().unwrap().to_string(), "[::1]:18100");

        let config = BridgeConfig::default().with_overrides(Some("localhost".into()), None);
        let addr = config.listen_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 18090);
    }

    #[test]
    fn test_bad_listen_host() {
        let config = BridgeConfig::default().with_overrides(Some("not a host".into()), None);
        assert!(config.listen_addr().is_err());
    }
}
