//! MIDI output backend on top of midir (CoreMIDI, ALSA, WinMM).
//!
//! Destinations are re-enumerated on every listing. Sending keeps one open
//! connection cached for the most recently used destination; the port is
//! looked up by name so an index that shifted between snapshots never
//! routes bytes to the wrong device.

use std::sync::Mutex;

use fountain_protocol::api::Destination;
use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info, warn};

use crate::MidiBackend;

const CONNECTION_NAME: &str = "fountain-bridge-out";

struct OpenPort {
    name: String,
    conn: MidiOutputConnection,
}

pub struct MidirBackend {
    client_name: String,
    open: Mutex<Option<OpenPort>>,
}

impl MidirBackend {
    /// Probe the platform MIDI subsystem once so an unavailable one is
    /// reported at startup.
    pub fn new(client_name: &str) -> anyhow::Result<Self> {
        let probe = MidiOutput::new(client_name)
            .map_err(|e| anyhow::anyhow!("Failed to initialise MIDI output: {}", e))?;
        info!(ports = probe.port_count(), "MIDI output initialised");

        Ok(Self {
            client_name: client_name.to_string(),
            open: Mutex::new(None),
        })
    }

    fn output(&self) -> anyhow::Result<MidiOutput> {
        MidiOutput::new(&self.client_name)
            .map_err(|e| anyhow::anyhow!("Failed to initialise MIDI output: {}", e))
    }

    fn open_port(&self, destination: &Destination) -> anyhow::Result<OpenPort> {
        let output = self.output()?;
        let ports = output.ports();

        let by_name = ports
            .iter()
            .find(|p| output.port_name(p).map(|n| n == destination.name).unwrap_or(false))
            .cloned();

        let port = by_name.ok_or_else(|| {
            anyhow::anyhow!("MIDI destination '{}' is gone", destination.name)
        })?;

        let conn = output
            .connect(&port, CONNECTION_NAME)
            .map_err(|e| anyhow::anyhow!("Failed to open '{}': {}", destination.name, e))?;

        info!(destination = %destination.name, "MIDI destination opened");
        Ok(OpenPort {
            name: destination.name.clone(),
            conn,
        })
    }
}

impl MidiBackend for MidirBackend {
    fn supported(&self) -> bool {
        true
    }

    fn destinations(&self) -> Vec<Destination> {
        let output = match self.output() {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "Destination enumeration failed");
                return Vec::new();
            }
        };

        output
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                output
                    .port_name(port)
                    .ok()
                    .map(|name| Destination { index, name })
            })
            .collect()
    }

    fn send(&self, destination: &Destination, data: &[u8]) -> anyhow::Result<()> {
        let mut open = self
            .open
            .lock()
            .map_err(|_| anyhow::anyhow!("MIDI output lock poisoned"))?;

        let reuse = matches!(&*open, Some(p) if p.name == destination.name);
        if !reuse {
            // Drop the previous connection before opening the next one.
            *open = None;
            *open = Some(self.open_port(destination)?);
        }

        let Some(port) = open.as_mut() else {
            return Ok(());
        };

        if let Err(e) = port.conn.send(data) {
            debug!(destination = %destination.name, "Dropping cached MIDI connection");
            *open = None;
            return Err(anyhow::anyhow!("MIDI send to '{}' failed: {}", destination.name, e));
        }
        Ok(())
    }
}
