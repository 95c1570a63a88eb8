//! Virtual MIDI endpoints backed by midir.
//!
//! Creates one virtual source ("Ploytec Virtual Input", bytes we emit) and
//! one virtual destination ("Ploytec Virtual Output", bytes other software
//! sends us). The destination's read callback feeds the bridge directly on
//! the MIDI subsystem's thread.

use std::sync::{Arc, Mutex};

use midir::os::unix::{VirtualInput, VirtualOutput};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::info;

use super::endpoints::{MidiEndpoints, MidiPortError};
use super::MidiBridge;

pub const CLIENT_NAME: &str = "PloytecApp";
pub const SOURCE_PORT_NAME: &str = "Ploytec Virtual Input";
pub const DESTINATION_PORT_NAME: &str = "Ploytec Virtual Output";

pub struct MidirEndpoints {
    source: Mutex<MidiOutputConnection>,
    // Held for its Drop impl: closing the connection removes the port.
    _destination: MidiInputConnection<()>,
}

impl MidirEndpoints {
    /// Create both virtual ports and register the bridge as the
    /// destination's read callback.
    pub fn create(bridge: Arc<MidiBridge>) -> Result<Arc<Self>, MidiPortError> {
        let output = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| MidiPortError::PortCreation(e.to_string()))?;
        let source = output
            .create_virtual(SOURCE_PORT_NAME)
            .map_err(|e| MidiPortError::PortCreation(e.to_string()))?;

        let mut input = MidiInput::new(CLIENT_NAME)
            .map_err(|e| MidiPortError::PortCreation(e.to_string()))?;
        input.ignore(Ignore::None);
        let destination = input
            .create_virtual(
                DESTINATION_PORT_NAME,
                move |_timestamp, bytes, _| {
                    bridge.handle_packet(bytes);
                },
                (),
            )
            .map_err(|e| MidiPortError::PortCreation(e.to_string()))?;

        info!(
            source = SOURCE_PORT_NAME,
            destination = DESTINATION_PORT_NAME,
            "virtual MIDI ports created"
        );

        Ok(Arc::new(Self {
            source: Mutex::new(source),
            _destination: destination,
        }))
    }
}

impl MidiEndpoints for MidirEndpoints {
    fn inject(&self, bytes: &[u8]) -> Result<(), MidiPortError> {
        self.source
            .lock()
            .unwrap()
            .send(bytes)
            .map_err(|e| MidiPortError::Inject(e.to_string()))
    }
}
