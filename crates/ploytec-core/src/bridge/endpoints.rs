//! Virtual MIDI endpoint boundary.

use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MidiPortError {
    #[error("failed to create virtual MIDI port: {0}")]
    PortCreation(String),

    #[error("failed to inject MIDI packet: {0}")]
    Inject(String),
}

/// The virtual-port facility, reduced to what the bridge needs: injecting
/// outbound bytes on the virtual source. Inbound bytes reach the bridge
/// through the read callback the implementation registers at creation.
pub trait MidiEndpoints: Send + Sync {
    fn inject(&self, bytes: &[u8]) -> Result<(), MidiPortError>;
}

/// Mock endpoints capturing injected packets for tests.
pub struct MockMidiEndpoints {
    injected: Mutex<Vec<Vec<u8>>>,
}

impl MockMidiEndpoints {
    pub fn new() -> Self {
        Self {
            injected: Mutex::new(Vec::new()),
        }
    }

    /// All injected packets, in order.
    pub fn injected(&self) -> Vec<Vec<u8>> {
        self.injected.lock().unwrap().clone()
    }
}

impl Default for MockMidiEndpoints {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiEndpoints for MockMidiEndpoints {
    fn inject(&self, bytes: &[u8]) -> Result<(), MidiPortError> {
        self.injected.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}
