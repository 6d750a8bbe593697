//! Collaborator fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fountain_bridge::ble_session::BleSession;
use fountain_bridge::router::Router;
use fountain_bridge::state::BridgeServices;
use fountain_device::{BlePeripheral, CentralId, MidiBackend, NetworkMidi};
use fountain_protocol::api::Destination;

/// MIDI backend with fixed outputs that records every send.
#[derive(Clone)]
pub struct FakeMidi {
    pub outputs: Vec<Destination>,
    pub sent: Arc<Mutex<Vec<(usize, Vec<u8>)>>>,
}

impl FakeMidi {
    pub fn with_outputs(names: &[&str]) -> Self {
        Self {
            outputs: names
                .iter()
                .enumerate()
                .map(|(index, name)| Destination { index, name: name.to_string() })
                .collect(),
            sent: Arc::default(),
        }
    }

    pub fn sent(&self) -> Vec<(usize, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl MidiBackend for FakeMidi {
    fn supported(&self) -> bool {
        true
    }

    fn destinations(&self) -> Vec<Destination> {
        self.outputs.clone()
    }

    fn send(&self, destination: &Destination, data: &[u8]) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((destination.index, data.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RadioLog {
    pub calls: Vec<String>,
    pub notifications: Vec<(Vec<u8>, Vec<CentralId>)>,
    pub write_replies: Vec<(CentralId, bool)>,
    pub services: Vec<(u128, u128)>,
}

/// BLE radio that accepts everything and logs what the session asked for.
#[derive(Clone, Default)]
pub struct FakeRadio {
    pub log: Arc<Mutex<RadioLog>>,
}

impl FakeRadio {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn notifications(&self) -> Vec<(Vec<u8>, Vec<CentralId>)> {
        self.log.lock().unwrap().notifications.clone()
    }
}

impl BlePeripheral for FakeRadio {
    fn supported(&self) -> bool {
        true
    }

    fn add_midi_service(&self, service: u128, characteristic: u128) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push("add_service".into());
        log.services.push((service, characteristic));
        Ok(())
    }

    fn remove_midi_service(&self) {
        self.log.lock().unwrap().calls.push("remove_service".into());
    }

    fn start_advertising(&self, name: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().calls.push(format!("advertise:{name}"));
        Ok(())
    }

    fn stop_advertising(&self) {
        self.log.lock().unwrap().calls.push("stop_advertising".into());
    }

    fn notify(&self, frame: &[u8], centrals: &[CentralId]) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .notifications
            .push((frame.to_vec(), centrals.to_vec()));
        Ok(())
    }

    fn respond_to_write(&self, central: &CentralId, accepted: bool) {
        self.log.lock().unwrap().write_replies.push((central.clone(), accepted));
    }
}

/// Network session that accepts toggles and invitations.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    pub invited: Arc<Mutex<Vec<(String, u16)>>>,
}

impl NetworkMidi for FakeNetwork {
    fn supported(&self) -> bool {
        true
    }

    fn set_enabled(&self, _enabled: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn connect(&self, host: &str, port: u16) -> anyhow::Result<()> {
        self.invited.lock().unwrap().push((host.to_string(), port));
        Ok(())
    }

    fn network_name(&self) -> String {
        "Fountain MIDI".into()
    }

    fn local_name(&self) -> String {
        "studio-mac".into()
    }
}

/// A bridge wired to fakes, with handles for inspecting them.
pub struct Harness {
    pub router: Arc<Router>,
    pub midi: FakeMidi,
    pub radio: FakeRadio,
    pub network: FakeNetwork,
}

impl Harness {
    pub fn new(outputs: &[&str]) -> Self {
        let midi = FakeMidi::with_outputs(outputs);
        let radio = FakeRadio::default();
        let network = FakeNetwork::default();

        let ble = Arc::new(BleSession::new(Box::new(radio.clone())));
        let services = BridgeServices::new(Arc::new(midi.clone()), ble, Box::new(network.clone()));

        Self {
            router: Arc::new(Router::new(Arc::new(services))),
            midi,
            radio,
            network,
        }
    }

    pub fn ble(&self) -> &BleSession {
        &self.router.services().ble
    }
}
