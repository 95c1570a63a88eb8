//! MIDI bridge.
//!
//! Couples a pair of virtual MIDI endpoints to the driver's MIDI path:
//! bytes arriving on the virtual destination are packed into driver words
//! and handed to the user client; hardware notifications are unpacked and
//! injected on the virtual source.
//!
//! Both callbacks originate from contexts the bridge does not own (the host
//! MIDI subsystem's near-real-time thread, the driver notification path),
//! so neither may block or panic on malformed input. The bridge holds only
//! a weak reference to the write path: when the owning controller is gone
//! it silently no-ops.

pub mod endpoints;
#[cfg(target_os = "macos")]
pub mod midir;

pub use endpoints::{MidiEndpoints, MidiPortError, MockMidiEndpoints};
#[cfg(target_os = "macos")]
pub use self::midir::MidirEndpoints;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::client::UserClient;
use crate::codec;

pub struct MidiBridge {
    /// Non-owning handle to the hardware write path.
    write_path: Weak<dyn UserClient>,
    endpoints: Mutex<Option<Arc<dyn MidiEndpoints>>>,
    dropped_messages: AtomicU64,
    invalid_notifications: AtomicU64,
}

impl MidiBridge {
    pub fn new(write_path: Weak<dyn UserClient>) -> Self {
        Self {
            write_path,
            endpoints: Mutex::new(None),
            dropped_messages: AtomicU64::new(0),
            invalid_notifications: AtomicU64::new(0),
        }
    }

    /// Attach the virtual endpoints once they exist. The endpoint side is
    /// created after the bridge because its read callback needs the bridge.
    pub fn attach_endpoints(&self, endpoints: Arc<dyn MidiEndpoints>) {
        *self.endpoints.lock().unwrap() = Some(endpoints);
    }

    /// Messages dropped for having an invalid length.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Hardware notifications discarded as malformed.
    pub fn invalid_notifications(&self) -> u64 {
        self.invalid_notifications.load(Ordering::Relaxed)
    }

    /// Handle one transport packet from the virtual destination.
    ///
    /// A packet may aggregate several 1..=3 byte runs; runs are split on
    /// status-byte boundaries. Runs with an invalid length are dropped and
    /// counted, the rest of the packet is still forwarded.
    pub fn handle_packet(&self, data: &[u8]) {
        let mut start = 0;
        for i in 1..data.len() {
            if data[i] & 0x80 != 0 {
                self.forward_run(&data[start..i]);
                start = i;
            }
        }
        self.forward_run(&data[start..]);
    }

    fn forward_run(&self, run: &[u8]) {
        let word = match codec::encode(run) {
            Ok(word) => word,
            Err(err) => {
                let total = self.dropped_messages.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(error = %err, total, "dropped MIDI message");
                return;
            }
        };
        let Some(client) = self.write_path.upgrade() else {
            // Owning controller is gone.
            return;
        };
        if let Err(err) = client.send_midi_word(word) {
            debug!(error = %err, "MIDI word not delivered");
        }
    }

    /// Handle a hardware-to-host notification carrying `(length, bytes)`.
    ///
    /// A zero length or a missing buffer is an invalid notification: logged
    /// and discarded. The copy is bounded defensively by the buffer length
    /// and the maximum message size, whatever `length` claims.
    pub fn handle_notification(&self, length: u8, bytes: Option<&[u8]>) {
        let Some(buf) = bytes else {
            self.discard_notification(length, "missing byte buffer");
            return;
        };
        if length == 0 || buf.is_empty() {
            self.discard_notification(length, "empty payload");
            return;
        }
        let n = (length as usize).min(buf.len()).min(codec::MAX_MESSAGE_LEN);
        let mut msg = [0u8; codec::MAX_MESSAGE_LEN];
        msg[..n].copy_from_slice(&buf[..n]);

        let endpoints = self.endpoints.lock().unwrap().clone();
        let Some(endpoints) = endpoints else {
            return;
        };
        if let Err(err) = endpoints.inject(&msg[..n]) {
            warn!(error = %err, "failed to inject MIDI packet");
        }
    }

    fn discard_notification(&self, length: u8, reason: &str) {
        let total = self.invalid_notifications.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(length, total, "invalid MIDI notification: {}", reason);
    }
}
