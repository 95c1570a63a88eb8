//! User-client trait and errors.

use thiserror::Error;

use super::stats::PlaybackStats;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("no open connection to the driver")]
    NotConnected,

    #[error("failed to open driver connection: {0}")]
    OpenFailed(String),

    #[error("driver call {method} failed: {message}")]
    CallFailed {
        method: &'static str,
        message: String,
    },

    #[error("short buffer from driver: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },
}

/// Abstract interface to the driver's user client.
///
/// This trait enables:
/// - Platform glue over the real privileged connection
/// - Mock implementation for unit testing
/// - In-process simulator for running without the driver
///
/// All calls are assumed bounded; none may block indefinitely. The MIDI
/// write path (`send_midi_word`) is called from the MIDI subsystem's own
/// near-real-time context and must stay allocation-light.
pub trait UserClient: Send + Sync {
    /// Open the connection. Returns a human-readable status string.
    fn open(&self) -> Result<String, ClientError>;

    /// Close the connection. Idempotent.
    fn close(&self);

    fn firmware_version(&self) -> Result<String, ClientError>;

    fn device_name(&self) -> Result<String, ClientError>;

    fn device_manufacturer(&self) -> Result<String, ClientError>;

    /// Snapshot of the driver's playback counters.
    fn playback_stats(&self) -> Result<PlaybackStats, ClientError>;

    /// Set the number of in-flight USB request blocks.
    fn set_urb_count(&self, count: u8) -> Result<(), ClientError>;

    fn urb_count(&self) -> Result<u8, ClientError>;

    /// Set frames-per-packet for the input and output directions.
    fn set_frame_counts(&self, input: u16, output: u16) -> Result<(), ClientError>;

    fn input_frame_count(&self) -> Result<u16, ClientError>;

    fn output_frame_count(&self) -> Result<u16, ClientError>;

    /// Change the driver's ring buffer size in bytes.
    fn set_buffer_size(&self, bytes: u32) -> Result<(), ClientError>;

    /// Hand one packed MIDI word to the driver (see [`crate::codec`]).
    fn send_midi_word(&self, word: u64) -> Result<(), ClientError>;
}
