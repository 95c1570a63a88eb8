//! Ploytec-Core: host-side control logic for the Ploytec driver extension.
//!
//! This crate implements the decision logic of the Ploytec control app: the
//! lifecycle of the privileged driver extension (dext) and the bidirectional
//! MIDI bridge between virtual MIDI ports and the hardware-facing driver.
//!
//! # Architecture
//!
//! The crate is organized into layers, leaf-first:
//!
//! - **Codec**: packing/unpacking short MIDI messages into the driver's
//!   64-bit word format
//! - **Lifecycle**: pure state machine for dext activation/deactivation
//! - **Events**: observer pattern for UI decoupling
//! - **Manager**: extension-manager boundary (request/callback API, mock)
//! - **Client**: hardware user-client boundary (trait, stats struct, mock,
//!   in-process simulator)
//! - **Bridge**: MIDI bridge coupling virtual endpoints to the driver
//! - **Session**: high-level orchestrator (command queue, connection loop)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ploytec_core::client::SimUserClient;
//! use ploytec_core::events::TracingObserver;
//! use ploytec_core::manager::MockExtensionManager;
//! use ploytec_core::session::{SessionConfig, SessionController};
//!
//! let client: Arc<dyn ploytec_core::client::UserClient> = Arc::new(SimUserClient::new());
//! let controller = SessionController::start(
//!     SessionConfig::default(),
//!     Arc::new(MockExtensionManager::new()),
//!     client,
//!     Arc::new(TracingObserver),
//! );
//! controller.activate();
//! ```

pub mod bridge;
pub mod client;
pub mod codec;
pub mod events;
pub mod lifecycle;
pub mod manager;
pub mod session;

// Re-exports for convenience
pub use bridge::{MidiBridge, MidiEndpoints, MidiPortError, MockMidiEndpoints};
pub use client::{ClientError, MockUserClient, PlaybackStats, SimUserClient, UserClient};
pub use codec::{CodecError, decode, encode};
pub use events::{NullObserver, SessionEvent, SessionObserver, TracingObserver};
pub use lifecycle::{DextEvent, DextState, transition};
pub use manager::{ExtensionManager, ManagerCallback, MockExtensionManager, RequestResult};
pub use session::{CallbackSink, SessionCommand, SessionConfig, SessionController};
