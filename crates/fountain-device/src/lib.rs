/// Platform collaborators of the bridge: MIDI output ports, the BLE
/// peripheral radio and the network MIDI session.
///
/// Each capability is a trait with a `supported()` query. A stub
/// implementation is selected at startup when the platform lacks the
/// capability, so the bridge's request handling never branches on the
/// target OS.

pub mod platform;

use std::fmt;

use fountain_protocol::api::Destination;
use tokio::sync::mpsc;

/// Output side of the platform MIDI subsystem.
pub trait MidiBackend: Send + Sync {
    /// Whether the platform MIDI subsystem could be initialised.
    fn supported(&self) -> bool;

    /// Enumerate output destinations. Re-enumerated on every call.
    fn destinations(&self) -> Vec<Destination>;

    /// Send one complete MIDI message to a destination.
    fn send(&self, destination: &Destination, data: &[u8]) -> anyhow::Result<()>;
}

/// Identity of a BLE central connected to the peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CentralId(pub String);

impl fmt::Display for CentralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CentralId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Asynchronous notifications from the BLE radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    PoweredOn,
    PoweredOff,
    /// A central subscribed to the MIDI characteristic
    Subscribed(CentralId),
    /// A central unsubscribed (or disconnected)
    Unsubscribed(CentralId),
    /// A central wrote to the MIDI characteristic
    Write { central: CentralId, data: Vec<u8> },
}

/// Peripheral role of the platform Bluetooth LE stack.
///
/// Power state and subscription changes are reported as [`RadioEvent`]s on
/// the channel handed to the implementation at construction.
pub trait BlePeripheral: Send + Sync {
    fn supported(&self) -> bool;

    /// Publish the GATT service `service` with its single I/O
    /// characteristic `characteristic` (read, write without response,
    /// notify).
    fn add_midi_service(&self, service: u128, characteristic: u128) -> anyhow::Result<()>;

    fn remove_midi_service(&self);

    fn start_advertising(&self, name: &str) -> anyhow::Result<()>;

    fn stop_advertising(&self);

    /// Send one notification on the MIDI characteristic to the given centrals.
    fn notify(&self, frame: &[u8], centrals: &[CentralId]) -> anyhow::Result<()>;

    /// Answer an attribute write request.
    fn respond_to_write(&self, central: &CentralId, accepted: bool);
}

/// Network MIDI (RTP-MIDI) session of the host.
pub trait NetworkMidi: Send + Sync {
    fn supported(&self) -> bool;

    /// Toggle the session. An error means the host rejected the change.
    fn set_enabled(&self, enabled: bool) -> anyhow::Result<()>;

    /// Invite a remote peer into the session.
    ///
    /// Must not block on the network: implementations that need name
    /// resolution finish it in the background and report failures in logs.
    fn connect(&self, host: &str, port: u16) -> anyhow::Result<()>;

    /// Name of the session as announced on the network.
    fn network_name(&self) -> String;

    /// Local (Bonjour) name of this host.
    fn local_name(&self) -> String;
}

/// Create the MIDI output backend, falling back to the stub when the
/// platform MIDI subsystem is unavailable.
pub fn create_midi_backend(client_name: &str) -> Box<dyn MidiBackend> {
    match platform::midir_backend::MidirBackend::new(client_name) {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            tracing::warn!(error = %e, "MIDI output not available, destinations disabled");
            Box::new(platform::unsupported::UnsupportedMidi)
        }
    }
}

/// Create the BLE peripheral radio.
///
/// No GATT server backend is wired up for any target yet, so this always
/// returns the stub; the channel is kept so a real backend can report power
/// and subscription changes through it.
pub fn create_ble_peripheral(events: mpsc::UnboundedSender<RadioEvent>) -> Box<dyn BlePeripheral> {
    drop(events);
    tracing::warn!("BLE peripheral role not supported on this platform");
    Box::new(platform::unsupported::UnsupportedBle)
}

/// Create the network MIDI session.
pub fn create_network_midi(
    enabled: bool,
    session_name: &str,
    local_name: &str,
    control_port: u16,
) -> Box<dyn NetworkMidi> {
    if enabled {
        Box::new(platform::applemidi::AppleMidiSession::new(
            session_name,
            local_name,
            control_port,
        ))
    } else {
        tracing::info!("Network MIDI disabled by configuration");
        Box::new(platform::unsupported::UnsupportedNetwork)
    }
}
