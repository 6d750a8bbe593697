//! Network (RTP-MIDI) session manager.
//!
//! Tracks the enabled flag, connection policy and the peers this bridge
//! has invited. Tearing down established connections on disable is left
//! to the network collaborator.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fountain_device::NetworkMidi;
use fountain_protocol::api::{ConnectionPolicy, RtpStatus};
use tracing::{info, warn};

#[derive(Default)]
struct NetworkState {
    enabled: bool,
    policy: ConnectionPolicy,
    connections: BTreeSet<(String, u16)>,
}

pub struct NetworkSessionManager {
    network: Box<dyn NetworkMidi>,
    state: Mutex<NetworkState>,
}

impl NetworkSessionManager {
    pub fn new(network: Box<dyn NetworkMidi>) -> Self {
        Self {
            network,
            state: Mutex::new(NetworkState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn supported(&self) -> bool {
        self.network.supported()
    }

    /// Toggle the session and return the resulting enabled state.
    ///
    /// Enabling opens the session to any peer. An error means the network
    /// collaborator rejected the toggle; the previous state is kept.
    pub fn set_enabled(&self, enabled: bool) -> anyhow::Result<bool> {
        let mut state = self.lock();
        self.network.set_enabled(enabled)?;

        state.enabled = enabled;
        if enabled {
            state.policy = ConnectionPolicy::Anyone;
        }
        info!(enabled, "Network MIDI session toggled");
        Ok(state.enabled)
    }

    /// Invite `host:port` into the session.
    ///
    /// Fails when the session is disabled, the host is empty, or the
    /// invitation could not be sent. The state lock is not held while the
    /// collaborator runs, so status queries never wait on a peer.
    pub fn connect(&self, host: &str, port: u16) -> bool {
        if host.is_empty() || !self.lock().enabled {
            return false;
        }

        match self.network.connect(host, port) {
            Ok(()) => {
                info!(host, port, "Network MIDI peer connected");
                self.lock().connections.insert((host.to_string(), port));
                true
            }
            Err(e) => {
                warn!(error = %e, host, port, "Network MIDI connect failed");
                false
            }
        }
    }

    pub fn status(&self) -> RtpStatus {
        if !self.supported() {
            return RtpStatus::unsupported();
        }

        let state = self.lock();
        RtpStatus {
            enabled: state.enabled,
            network_name: self.network.network_name(),
            local_name: self.network.local_name(),
            connection_policy: state.policy,
        }
    }

    /// Peers invited so far, sorted by host then port.
    pub fn connections(&self) -> Vec<(String, u16)> {
        self.lock().connections.iter().cloned().collect()
    }
}
