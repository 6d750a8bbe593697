//! Fan-out of MIDI 1.0 batches to the active transports.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fountain_device::MidiBackend;
use fountain_protocol::api::Destination;
use fountain_protocol::midi::{sanitize_message, MidiValue};
use tracing::{debug, info, warn};

use crate::ble_session::BleSession;

pub struct TransportDispatcher {
    midi: Arc<dyn MidiBackend>,
    ble: Arc<BleSession>,
    selected: Mutex<Option<Destination>>,
}

impl TransportDispatcher {
    pub fn new(midi: Arc<dyn MidiBackend>, ble: Arc<BleSession>) -> Self {
        Self {
            midi,
            ble,
            selected: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Destination>> {
        self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `destination` the device output target, replacing any previous one.
    pub fn select(&self, destination: Destination) {
        info!(index = destination.index, name = %destination.name, "MIDI destination selected");
        *self.lock() = Some(destination);
    }

    pub fn selected(&self) -> Option<Destination> {
        self.lock().clone()
    }

    /// Forward each message to the selected destination and the BLE session.
    ///
    /// Out-of-range values are dropped and messages left empty are skipped.
    /// The two transports are attempted independently. Returns the number of
    /// messages forwarded.
    pub fn send_midi1(&self, messages: &[Vec<MidiValue>]) -> usize {
        let selected = self.selected();
        let mut forwarded = 0;

        for message in messages {
            let Some(bytes) = sanitize_message(message) else {
                debug!("Dropping empty MIDI message");
                continue;
            };

            if let Some(dest) = &selected {
                if let Err(e) = self.midi.send(dest, &bytes) {
                    warn!(error = %e, destination = %dest.name, "Device send failed");
                }
            }
            self.ble.send(&bytes);
            forwarded += 1;
        }

        forwarded
    }
}
