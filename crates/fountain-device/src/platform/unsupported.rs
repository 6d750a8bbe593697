//! Stub collaborators for platforms lacking a capability.
//!
//! They report `supported() == false` and accept every call as a no-op, so
//! handlers degrade to their default payloads instead of failing.

use fountain_protocol::api::Destination;

use crate::{BlePeripheral, CentralId, MidiBackend, NetworkMidi};

pub struct UnsupportedMidi;

impl MidiBackend for UnsupportedMidi {
    fn supported(&self) -> bool {
        false
    }

    fn destinations(&self) -> Vec<Destination> {
        Vec::new()
    }

    fn send(&self, _destination: &Destination, _data: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct UnsupportedBle;

impl BlePeripheral for UnsupportedBle {
    fn supported(&self) -> bool {
        false
    }

    fn add_midi_service(&self, _service: u128, _characteristic: u128) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("BLE peripheral not supported"))
    }

    fn remove_midi_service(&self) {}

    fn start_advertising(&self, _name: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("BLE peripheral not supported"))
    }

    fn stop_advertising(&self) {}

    fn notify(&self, _frame: &[u8], _centrals: &[CentralId]) -> anyhow::Result<()> {
        Ok(())
    }

    fn respond_to_write(&self, _central: &CentralId, _accepted: bool) {}
}

pub struct UnsupportedNetwork;

impl NetworkMidi for UnsupportedNetwork {
    fn supported(&self) -> bool {
        false
    }

    fn set_enabled(&self, _enabled: bool) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("network MIDI not supported"))
    }

    fn connect(&self, _host: &str, _port: u16) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("network MIDI not supported"))
    }

    fn network_name(&self) -> String {
        String::new()
    }

    fn local_name(&self) -> String {
        String::new()
    }
}
