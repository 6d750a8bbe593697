//! BLE MIDI peripheral session.
//!
//! State machine:
//!   Idle ──start()──▶ Advertising          (radio powered on)
//!   Idle ──start()──▶ Pending ──PoweredOn──▶ Advertising
//!   Advertising ──PoweredOff──▶ Pending
//!   any ──stop()──▶ Idle                    (service removed, subscribers cleared)
//!
//! Radio events arrive on a single-consumer channel and are applied by
//! [`run_events`], so power-on is the only place a start is deferred rather
//! than failed.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fountain_device::{BlePeripheral, CentralId, RadioEvent};
use fountain_protocol::api::BleStatus;
use fountain_protocol::ble::{frame_message, MIDI_CHARACTERISTIC_UUID, MIDI_SERVICE_UUID};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingState {
    Idle,
    /// Start requested, waiting for the radio to power on
    Pending,
    Advertising,
}

struct SessionState {
    powered_on: bool,
    advertising: AdvertisingState,
    name: String,
    /// MIDI service published (the characteristic exists)
    service_active: bool,
    subscribers: BTreeSet<CentralId>,
}

pub struct BleSession {
    radio: Box<dyn BlePeripheral>,
    state: Mutex<SessionState>,
}

impl BleSession {
    pub fn new(radio: Box<dyn BlePeripheral>) -> Self {
        Self {
            radio,
            state: Mutex::new(SessionState {
                powered_on: false,
                advertising: AdvertisingState::Idle,
                name: String::new(),
                service_active: false,
                subscribers: BTreeSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn supported(&self) -> bool {
        self.radio.supported()
    }

    pub fn advertising_state(&self) -> AdvertisingState {
        self.lock().advertising
    }

    /// Request advertising under `name`.
    ///
    /// Returns false if BLE is unsupported or the radio refused the service.
    /// While the radio is powered off the request is recorded and applied on
    /// the next `PoweredOn` event.
    pub fn start(&self, name: &str) -> bool {
        if !self.supported() {
            return false;
        }

        let mut state = self.lock();
        if state.advertising == AdvertisingState::Advertising && state.name == name {
            return true;
        }
        state.name = name.to_string();

        if !state.powered_on {
            info!(name, "BLE radio not powered on, advertising deferred");
            state.advertising = AdvertisingState::Pending;
            return true;
        }

        match self.begin_advertising(&mut state) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, name, "Failed to start BLE advertising");
                self.teardown(&mut state);
                false
            }
        }
    }

    /// Stop advertising and remove the service. Idempotent.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.advertising != AdvertisingState::Idle || state.service_active {
            info!(name = %state.name, "BLE advertising stopped");
        }
        self.teardown(&mut state);
    }

    pub fn status(&self) -> BleStatus {
        let state = self.lock();
        BleStatus {
            enabled: state.powered_on,
            advertising: state.advertising == AdvertisingState::Advertising,
            name: state.name.clone(),
            subscribed: state.subscribers.len(),
        }
    }

    /// Notify every subscriber with `data`, one notification per BLE frame.
    ///
    /// No-op while the MIDI service is not published. Notifications cannot
    /// be recalled: when one fails the remaining frames are dropped, but
    /// frames already handed to the radio stay delivered, so a central can
    /// see the head of a multi-frame message without its tail.
    pub fn send(&self, data: &[u8]) {
        let state = self.lock();
        if !state.service_active || state.subscribers.is_empty() {
            return;
        }

        let centrals: Vec<CentralId> = state.subscribers.iter().cloned().collect();
        for frame in frame_message(data) {
            if let Err(e) = self.radio.notify(frame.as_bytes(), &centrals) {
                // Later frames would arrive out of context, drop the rest.
                debug!(error = %e, "BLE notification failed");
                break;
            }
        }
    }

    /// Apply one radio event.
    pub fn handle_event(&self, event: RadioEvent) {
        let mut state = self.lock();
        match event {
            RadioEvent::PoweredOn => {
                state.powered_on = true;
                info!("BLE radio powered on");
                if state.advertising == AdvertisingState::Pending {
                    if let Err(e) = self.begin_advertising(&mut state) {
                        warn!(error = %e, "Deferred BLE advertising failed");
                        self.teardown(&mut state);
                    }
                }
            }
            RadioEvent::PoweredOff => {
                state.powered_on = false;
                info!("BLE radio powered off");
                // The stack drops services and centrals with the radio.
                state.service_active = false;
                state.subscribers.clear();
                if state.advertising == AdvertisingState::Advertising {
                    state.advertising = AdvertisingState::Pending;
                }
            }
            RadioEvent::Subscribed(central) => {
                info!(%central, "BLE central subscribed");
                state.subscribers.insert(central);
            }
            RadioEvent::Unsubscribed(central) => {
                if state.subscribers.remove(&central) {
                    info!(%central, "BLE central unsubscribed");
                }
            }
            RadioEvent::Write { central, data } => {
                trace!(%central, bytes = data.len(), "BLE write accepted");
                self.radio.respond_to_write(&central, true);
            }
        }
    }

    fn begin_advertising(&self, state: &mut SessionState) -> anyhow::Result<()> {
        if !state.service_active {
            self.radio.add_midi_service(MIDI_SERVICE_UUID, MIDI_CHARACTERISTIC_UUID)?;
            state.service_active = true;
        }
        if state.advertising == AdvertisingState::Advertising {
            self.radio.stop_advertising();
        }
        self.radio.start_advertising(&state.name)?;
        state.advertising = AdvertisingState::Advertising;
        info!(name = %state.name, "BLE advertising started");
        Ok(())
    }

    fn teardown(&self, state: &mut SessionState) {
        self.radio.stop_advertising();
        if state.service_active {
            self.radio.remove_midi_service();
        }
        state.service_active = false;
        state.subscribers.clear();
        state.advertising = AdvertisingState::Idle;
    }
}

/// Apply radio events until the radio side drops its sender.
pub async fn run_events(session: Arc<BleSession>, mut events: mpsc::UnboundedReceiver<RadioEvent>) {
    while let Some(event) = events.recv().await {
        session.handle_event(event);
    }
    debug!("BLE radio event channel closed");
}
