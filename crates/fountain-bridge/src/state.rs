//! Process-wide service objects of the bridge.
//!
//! Built once in `main` and handed to the router; each service is the only
//! instance of its kind in the process.

use std::sync::Arc;

use fountain_device::{MidiBackend, NetworkMidi};

use crate::ble_session::BleSession;
use crate::dispatcher::TransportDispatcher;
use crate::network_session::NetworkSessionManager;
use crate::registry::DestinationRegistry;

pub struct BridgeServices {
    pub registry: DestinationRegistry,
    pub dispatcher: TransportDispatcher,
    pub ble: Arc<BleSession>,
    pub rtp: NetworkSessionManager,
}

impl BridgeServices {
    pub fn new(
        midi: Arc<dyn MidiBackend>,
        ble: Arc<BleSession>,
        network: Box<dyn NetworkMidi>,
    ) -> Self {
        Self {
            registry: DestinationRegistry::new(Arc::clone(&midi)),
            dispatcher: TransportDispatcher::new(midi, Arc::clone(&ble)),
            ble,
            rtp: NetworkSessionManager::new(network),
        }
    }
}
