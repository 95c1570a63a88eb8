//! Session controller.
//!
//! Owns the lifecycle state and serializes every mutation through one
//! worker thread: user commands and extension-manager callbacks enter the
//! same queue, so ordering is FIFO per source and the transition function
//! is never invoked concurrently on the same state.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::UserClient;
use crate::events::{SessionEvent, SessionObserver};
use crate::lifecycle::{DextEvent, DextState, transition};
use crate::manager::{
    ERROR_CODE_SIGNATURE_INVALID, ERROR_EXTENSION_NOT_FOUND, ExtensionManager, ManagerCallback,
};

use super::config::SessionConfig;
use super::connection::ConnectionSupervisor;

/// User-issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Submit an activation request for the dext.
    Activate,
    /// Submit a deactivation request.
    Deactivate,
    /// Query the dext's current enabled state.
    CheckStatus,
    SetUrbCount(u8),
    SetFrameCounts { input: u16, output: u16 },
    SetBufferSize(u32),
}

enum Input {
    Command(SessionCommand),
    Callback(ManagerCallback),
    Shutdown,
}

/// Direction of the extension-manager request in flight. The manager's
/// `finished`/`failed` callbacks carry no direction of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Activation,
    Deactivation,
}

/// Last observed device parameter values; writes with an unchanged value
/// are suppressed. Shared with the connection supervisor, which refreshes
/// the cache on every (re)connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParamCache {
    pub urb_count: Option<u8>,
    pub input_frames: Option<u16>,
    pub output_frames: Option<u16>,
    pub buffer_size: Option<u32>,
}

/// Handle the extension-manager glue uses to deliver callbacks into the
/// controller's queue. Delivery after shutdown is a silent no-op.
#[derive(Clone)]
pub struct CallbackSink {
    tx: Sender<Input>,
}

impl CallbackSink {
    pub fn deliver(&self, callback: ManagerCallback) {
        let _ = self.tx.send(Input::Callback(callback));
    }
}

pub struct SessionController {
    tx: Sender<Input>,
    state: Arc<Mutex<DextState>>,
    client: Arc<dyn UserClient>,
    worker: Option<JoinHandle<()>>,
    supervisor: ConnectionSupervisor,
}

impl SessionController {
    /// Start the controller: spawns the command worker and the connection
    /// supervisor, and queries the dext's current enabled state (it does
    /// not necessarily start deactivated).
    pub fn start(
        config: SessionConfig,
        manager: Arc<dyn ExtensionManager>,
        client: Arc<dyn UserClient>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(DextState::default()));
        let params = Arc::new(Mutex::new(ParamCache::default()));

        let worker = Worker {
            rx,
            manager,
            observer: observer.clone(),
            client: client.clone(),
            state: state.clone(),
            params: params.clone(),
            identifier: config.dext_identifier.clone(),
            pending: None,
        };
        let worker = thread::spawn(move || worker.run());

        let supervisor = ConnectionSupervisor::start(
            client.clone(),
            params,
            observer,
            Duration::from_millis(config.retry_interval_ms),
            Duration::from_millis(config.stats_interval_ms),
        );

        let controller = Self {
            tx,
            state,
            client,
            worker: Some(worker),
            supervisor,
        };
        controller.send(SessionCommand::CheckStatus);
        controller
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DextState {
        *self.state.lock().unwrap()
    }

    pub fn activate(&self) {
        self.send(SessionCommand::Activate);
    }

    pub fn deactivate(&self) {
        self.send(SessionCommand::Deactivate);
    }

    pub fn check_status(&self) {
        self.send(SessionCommand::CheckStatus);
    }

    pub fn set_urb_count(&self, count: u8) {
        self.send(SessionCommand::SetUrbCount(count));
    }

    pub fn set_frame_counts(&self, input: u16, output: u16) {
        self.send(SessionCommand::SetFrameCounts { input, output });
    }

    pub fn set_buffer_size(&self, bytes: u32) {
        self.send(SessionCommand::SetBufferSize(bytes));
    }

    /// Sink for extension-manager callbacks.
    pub fn callback_sink(&self) -> CallbackSink {
        CallbackSink {
            tx: self.tx.clone(),
        }
    }

    /// Non-owning handle to the hardware write path, for the MIDI bridge.
    pub fn midi_write_path(&self) -> Weak<dyn UserClient> {
        Arc::downgrade(&self.client)
    }

    /// Stop both threads. After this returns no further callback fires.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn send(&self, command: SessionCommand) {
        let _ = self.tx.send(Input::Command(command));
    }

    fn stop(&mut self) {
        let _ = self.tx.send(Input::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.supervisor.stop();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    rx: Receiver<Input>,
    manager: Arc<dyn ExtensionManager>,
    observer: Arc<dyn SessionObserver>,
    client: Arc<dyn UserClient>,
    state: Arc<Mutex<DextState>>,
    params: Arc<Mutex<ParamCache>>,
    identifier: String,
    pending: Option<Direction>,
}

impl Worker {
    fn run(mut self) {
        while let Ok(input) = self.rx.recv() {
            match input {
                Input::Shutdown => break,
                Input::Command(command) => self.handle_command(command),
                Input::Callback(callback) => self.handle_callback(callback),
            }
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Activate => {
                info!(identifier = %self.identifier, "dext activation request");
                self.manager.activate(&self.identifier);
                self.pending = Some(Direction::Activation);
                self.apply(DextEvent::ActivationStarted);
            }
            SessionCommand::Deactivate => {
                info!(identifier = %self.identifier, "dext deactivation request");
                self.manager.deactivate(&self.identifier);
                self.pending = Some(Direction::Deactivation);
                self.apply(DextEvent::DeactivationStarted);
            }
            SessionCommand::CheckStatus => {
                self.manager.query_properties(&self.identifier);
            }
            SessionCommand::SetUrbCount(count) => {
                if self.params.lock().unwrap().urb_count == Some(count) {
                    debug!(count, "URB count unchanged, write suppressed");
                    return;
                }
                match self.client.set_urb_count(count) {
                    Ok(()) => self.params.lock().unwrap().urb_count = Some(count),
                    Err(err) => warn!(error = %err, "failed to set URB count"),
                }
            }
            SessionCommand::SetFrameCounts { input, output } => {
                let cached = *self.params.lock().unwrap();
                if cached.input_frames == Some(input) && cached.output_frames == Some(output) {
                    debug!(input, output, "frame counts unchanged, write suppressed");
                    return;
                }
                match self.client.set_frame_counts(input, output) {
                    Ok(()) => {
                        let mut params = self.params.lock().unwrap();
                        params.input_frames = Some(input);
                        params.output_frames = Some(output);
                    }
                    Err(err) => warn!(error = %err, "failed to set frame counts"),
                }
            }
            SessionCommand::SetBufferSize(bytes) => {
                if self.params.lock().unwrap().buffer_size == Some(bytes) {
                    debug!(bytes, "buffer size unchanged, write suppressed");
                    return;
                }
                match self.client.set_buffer_size(bytes) {
                    Ok(()) => self.params.lock().unwrap().buffer_size = Some(bytes),
                    Err(err) => warn!(error = %err, "failed to set buffer size"),
                }
            }
        }
    }

    fn handle_callback(&mut self, callback: ManagerCallback) {
        debug!(callback = %callback, "extension manager callback");
        match callback {
            ManagerCallback::NeedsApproval => self.apply(DextEvent::PromptForApproval),
            ManagerCallback::Finished { .. } => {
                let event = match self.pending.take() {
                    Some(Direction::Deactivation) => DextEvent::DeactivationFinished,
                    _ => DextEvent::ActivationFinished,
                };
                self.apply(event);
            }
            ManagerCallback::Failed { code } => {
                let event = match code {
                    ERROR_EXTENSION_NOT_FOUND => DextEvent::DextNotPresent,
                    ERROR_CODE_SIGNATURE_INVALID => DextEvent::CodeSigningErr,
                    _ => match self.pending {
                        Some(Direction::Deactivation) => DextEvent::DeactivationFailed,
                        _ => DextEvent::ActivationFailed,
                    },
                };
                self.pending = None;
                self.apply(event);
            }
            ManagerCallback::FoundProperties { enabled } => {
                // Startup confirmation of the externally-observed state;
                // the one place the state is set without a transition.
                let confirmed = if enabled {
                    DextState::Activated
                } else {
                    DextState::Deactivated
                };
                info!(enabled, "found extension properties");
                *self.state.lock().unwrap() = confirmed;
                self.notify(confirmed);
            }
        }
    }

    fn apply(&self, event: DextEvent) {
        let next = {
            let mut state = self.state.lock().unwrap();
            let from = *state;
            let next = transition(from, event);
            *state = next;
            info!(from = %from, to = %next, event = %event, "lifecycle transition");
            next
        };
        self.notify(next);
    }

    fn notify(&self, state: DextState) {
        self.observer.on_event(&SessionEvent::StateChanged {
            state,
            message: state.status_message(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientCall, MockUserClient};
    use crate::manager::{ManagerRequest, MockExtensionManager, RequestResult};
    use std::time::Instant;

    fn test_config() -> SessionConfig {
        SessionConfig {
            retry_interval_ms: 10,
            stats_interval_ms: 10,
            ..SessionConfig::default()
        }
    }

    fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn wait_for_state(controller: &SessionController, state: DextState) {
        assert!(
            wait_until(Duration::from_secs(1), || controller.state() == state),
            "expected state {state}, got {}",
            controller.state()
        );
    }

    struct Harness {
        manager: Arc<MockExtensionManager>,
        client: Arc<MockUserClient>,
        controller: SessionController,
    }

    fn start_harness() -> Harness {
        let manager = Arc::new(MockExtensionManager::new());
        let client = Arc::new(MockUserClient::new());
        let controller = SessionController::start(
            test_config(),
            manager.clone(),
            client.clone(),
            Arc::new(crate::events::NullObserver),
        );
        Harness {
            manager,
            client,
            controller,
        }
    }

    #[test]
    fn test_queries_properties_on_start() {
        let h = start_harness();
        assert!(wait_until(Duration::from_secs(1), || {
            h.manager
                .requests()
                .contains(&ManagerRequest::QueryProperties(
                    "sc.hackerman.ploytecdriver".into(),
                ))
        }));
        assert_eq!(h.controller.state(), DextState::Deactivated);
    }

    #[test]
    fn test_activation_flow() {
        let h = start_harness();

        h.controller.activate();
        wait_for_state(&h.controller, DextState::Activating);
        assert!(
            h.manager
                .requests()
                .contains(&ManagerRequest::Activate("sc.hackerman.ploytecdriver".into()))
        );

        let sink = h.controller.callback_sink();
        sink.deliver(ManagerCallback::NeedsApproval);
        wait_for_state(&h.controller, DextState::NeedsActivatingApproval);

        sink.deliver(ManagerCallback::Finished {
            result: RequestResult::Completed,
        });
        wait_for_state(&h.controller, DextState::Activated);
    }

    #[test]
    fn test_deactivation_flow() {
        let h = start_harness();
        let sink = h.controller.callback_sink();

        sink.deliver(ManagerCallback::FoundProperties { enabled: true });
        wait_for_state(&h.controller, DextState::Activated);

        h.controller.deactivate();
        wait_for_state(&h.controller, DextState::Deactivating);

        // The manager's finish callback carries no direction; the
        // controller must map it onto the deactivation flow.
        sink.deliver(ManagerCallback::Finished {
            result: RequestResult::Completed,
        });
        wait_for_state(&h.controller, DextState::Deactivated);
    }

    #[test]
    fn test_failure_classification() {
        let h = start_harness();
        let sink = h.controller.callback_sink();

        h.controller.activate();
        wait_for_state(&h.controller, DextState::Activating);
        sink.deliver(ManagerCallback::Failed {
            code: ERROR_EXTENSION_NOT_FOUND,
        });
        wait_for_state(&h.controller, DextState::DextNotPresentError);

        h.controller.activate();
        wait_for_state(&h.controller, DextState::Activating);
        sink.deliver(ManagerCallback::Failed {
            code: ERROR_CODE_SIGNATURE_INVALID,
        });
        wait_for_state(&h.controller, DextState::CodeSigningError);

        h.controller.activate();
        wait_for_state(&h.controller, DextState::Activating);
        sink.deliver(ManagerCallback::Failed { code: -536870187 });
        wait_for_state(&h.controller, DextState::ActivationError);
    }

    #[test]
    fn test_found_properties_confirms_state() {
        let h = start_harness();
        let sink = h.controller.callback_sink();

        sink.deliver(ManagerCallback::FoundProperties { enabled: true });
        wait_for_state(&h.controller, DextState::Activated);

        sink.deliver(ManagerCallback::FoundProperties { enabled: false });
        wait_for_state(&h.controller, DextState::Deactivated);
    }

    #[test]
    fn test_parameter_write_suppression() {
        let h = start_harness();

        // Wait for connection + parameter readback (mock default URB count
        // is 8).
        assert!(wait_until(Duration::from_secs(1), || {
            h.client.calls().contains(&ClientCall::GetUrbCount)
        }));

        h.controller.set_urb_count(8);
        h.controller.set_urb_count(4);
        assert!(wait_until(Duration::from_secs(1), || {
            h.client.calls().contains(&ClientCall::SetUrbCount(4))
        }));
        // The redundant write for the already-current value never happened.
        assert!(!h.client.calls().contains(&ClientCall::SetUrbCount(8)));

        // Same value again: suppressed now that it is cached.
        h.client.clear_calls();
        h.controller.set_urb_count(4);
        h.controller.set_frame_counts(80, 80);
        thread::sleep(Duration::from_millis(50));
        assert!(!h.client.calls().contains(&ClientCall::SetUrbCount(4)));
        assert!(!h.client.calls().contains(&ClientCall::SetFrameCounts(80, 80)));
    }

    #[test]
    fn test_retry_and_poll_are_mutually_exclusive() {
        let manager = Arc::new(MockExtensionManager::new());
        let client = Arc::new(MockUserClient::new());
        client.set_open_error(Some("no device"));

        let controller = SessionController::start(
            test_config(),
            manager,
            client.clone(),
            Arc::new(crate::events::NullObserver),
        );

        // Disconnected: the retry schedule runs, the poll schedule never.
        assert!(wait_until(Duration::from_secs(1), || {
            client
                .calls()
                .iter()
                .filter(|c| **c == ClientCall::Open)
                .count()
                >= 2
        }));
        assert!(!client.calls().contains(&ClientCall::GetStats));

        // Connected: polling starts.
        client.set_open_error(None);
        assert!(wait_until(Duration::from_secs(1), || {
            client.calls().contains(&ClientCall::GetStats)
        }));

        // Device goes away mid-poll: polling stops, the retry schedule
        // takes over within one iteration.
        client.set_open_error(Some("unplugged"));
        client.set_stats_error(true);
        assert!(wait_until(Duration::from_secs(1), || {
            client.calls().contains(&ClientCall::Close)
        }));

        client.clear_calls();
        assert!(wait_until(Duration::from_secs(1), || {
            client.calls().iter().any(|c| *c == ClientCall::Open)
        }));
        assert!(!client.calls().contains(&ClientCall::GetStats));

        controller.shutdown();
    }

    #[test]
    fn test_shutdown_stops_all_schedules() {
        let h = start_harness();
        assert!(wait_until(Duration::from_secs(1), || {
            h.client.calls().contains(&ClientCall::GetStats)
        }));

        h.controller.shutdown();
        h.client.clear_calls();
        thread::sleep(Duration::from_millis(50));
        assert!(h.client.calls().is_empty());
    }
}
