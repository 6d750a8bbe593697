//! Destination registry: a live view over the platform's MIDI outputs.

use std::sync::Arc;

use fountain_device::MidiBackend;
use fountain_protocol::api::Destination;

pub struct DestinationRegistry {
    backend: Arc<dyn MidiBackend>,
}

impl DestinationRegistry {
    pub fn new(backend: Arc<dyn MidiBackend>) -> Self {
        Self { backend }
    }

    /// Current destinations in platform enumeration order. Never cached.
    pub fn list(&self) -> Vec<Destination> {
        self.backend.destinations()
    }

    /// First destination whose name contains `needle`, ignoring case.
    ///
    /// This is a first match in enumeration order, not a best match.
    pub fn select(&self, needle: &str) -> Option<Destination> {
        let needle = needle.to_lowercase();
        self.list()
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
    }
}
