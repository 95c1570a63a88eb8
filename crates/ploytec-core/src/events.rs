//! Event system for UI decoupling.
//!
//! Front-ends (CLI, menu bar, future GUI) subscribe to session events
//! without tight coupling to the core logic. The core never prints.

use crate::client::PlaybackStats;
use crate::lifecycle::DextState;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Events emitted by the session controller.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Lifecycle state changed.
    StateChanged {
        state: DextState,
        message: &'static str,
    },
    /// Hardware connection opened.
    Connected { status: String },
    /// Hardware connection lost.
    Disconnected,
    /// Device info strings, fetched once per (re)connection.
    DeviceInfo {
        name: String,
        manufacturer: String,
        firmware: String,
    },
    /// Fresh statistics snapshot from the poll loop.
    Stats(PlaybackStats),
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Observer trait for receiving session events.
///
/// Implement this trait in your UI layer to receive updates. Callbacks run
/// on the controller's own threads and must not block.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_event(&self, _event: &SessionEvent) {
        // Do nothing
    }
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::StateChanged { state, message } => {
                tracing::info!(state = %state, "{}", message);
            }
            SessionEvent::Connected { status } => {
                tracing::info!(status = %status, "User client connected");
            }
            SessionEvent::Disconnected => {
                tracing::warn!("User client disconnected");
            }
            SessionEvent::DeviceInfo {
                name,
                manufacturer,
                firmware,
            } => {
                tracing::info!(name = %name, manufacturer = %manufacturer, firmware = %firmware, "Device info");
            }
            SessionEvent::Stats(stats) => {
                tracing::debug!(
                    playing = stats.playing,
                    recording = stats.recording,
                    out_sample_time = stats.out_sample_time,
                    in_sample_time = stats.in_sample_time,
                    midi_out = stats.usb_midi_out_bytes,
                    midi_in = stats.usb_midi_in_bytes,
                    xruns = stats.xruns,
                    "Playback stats"
                );
            }
            SessionEvent::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}
