//! Hardware connection supervisor.
//!
//! One dedicated thread alternates between two mutually exclusive
//! schedules: while disconnected it retries `open()` on the retry interval;
//! while connected it polls playback statistics on the stats interval. A
//! failed poll is treated as the device going away, after which the retry
//! schedule takes over in the same loop iteration. Because a single thread
//! runs both schedules, they can never be armed at the same time.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::UserClient;
use crate::events::{LogLevel, SessionEvent, SessionObserver};

use super::controller::ParamCache;

/// Stop flag with a condvar so interval waits are interruptible. After
/// [`ConnectionSupervisor::stop`] returns, no further poll or retry fires.
pub(crate) struct StopSignal {
    flag: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    pub(crate) fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    pub(crate) fn set(&self) {
        *self.flag.lock().unwrap() = true;
        self.cvar.notify_all();
    }

    pub(crate) fn is_set(&self) -> bool {
        *self.flag.lock().unwrap()
    }

    /// Wait up to `timeout`; returns true if stop was requested.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let stopped = self.flag.lock().unwrap();
        let (stopped, _) = self
            .cvar
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap();
        *stopped
    }
}

pub(crate) struct ConnectionSupervisor {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl ConnectionSupervisor {
    pub(crate) fn start(
        client: Arc<dyn UserClient>,
        params: Arc<Mutex<ParamCache>>,
        observer: Arc<dyn SessionObserver>,
        retry_interval: Duration,
        stats_interval: Duration,
    ) -> Self {
        let stop = Arc::new(StopSignal::new());
        let worker = ConnectionLoop {
            client,
            params,
            observer,
            retry_interval,
            stats_interval,
            stop: stop.clone(),
        };
        let handle = thread::spawn(move || worker.run());
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Request stop and wait for the loop to exit.
    pub(crate) fn stop(&mut self) {
        self.stop.set();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct ConnectionLoop {
    client: Arc<dyn UserClient>,
    params: Arc<Mutex<ParamCache>>,
    observer: Arc<dyn SessionObserver>,
    retry_interval: Duration,
    stats_interval: Duration,
    stop: Arc<StopSignal>,
}

impl ConnectionLoop {
    fn run(self) {
        let mut connected = false;
        while !self.stop.is_set() {
            if !connected {
                match self.client.open() {
                    Ok(status) => {
                        info!(status = %status, "user client connected");
                        connected = true;
                        self.resync_params();
                        self.emit_device_info();
                        self.observer.on_event(&SessionEvent::Connected { status });
                    }
                    Err(err) => {
                        debug!(
                            error = %err,
                            retry_ms = self.retry_interval.as_millis() as u64,
                            "user client open failed"
                        );
                        self.observer.on_event(&SessionEvent::Log {
                            level: LogLevel::Debug,
                            message: format!("driver connection failed: {err}"),
                        });
                        if self.stop.wait(self.retry_interval) {
                            break;
                        }
                    }
                }
            } else {
                match self.client.playback_stats() {
                    Ok(stats) => {
                        self.observer.on_event(&SessionEvent::Stats(stats));
                        if self.stop.wait(self.stats_interval) {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "stats poll failed, device disconnected");
                        self.client.close();
                        *self.params.lock().unwrap() = ParamCache::default();
                        connected = false;
                        self.observer.on_event(&SessionEvent::Disconnected);
                        // Retry schedule takes over on the next iteration.
                    }
                }
            }
        }
        if connected {
            self.client.close();
        }
    }

    /// Read back the device parameters so held configuration matches the
    /// hardware after a (re)connection. There is no readback call for the
    /// buffer size; its cache starts over unknown.
    fn resync_params(&self) {
        let mut params = self.params.lock().unwrap();
        *params = ParamCache::default();
        match self.client.urb_count() {
            Ok(count) => params.urb_count = Some(count),
            Err(err) => warn!(error = %err, "URB count readback failed"),
        }
        match self.client.input_frame_count() {
            Ok(frames) => params.input_frames = Some(frames),
            Err(err) => warn!(error = %err, "input frame count readback failed"),
        }
        match self.client.output_frame_count() {
            Ok(frames) => params.output_frames = Some(frames),
            Err(err) => warn!(error = %err, "output frame count readback failed"),
        }
    }

    fn emit_device_info(&self) {
        let info = (
            self.client.device_name(),
            self.client.device_manufacturer(),
            self.client.firmware_version(),
        );
        match info {
            (Ok(name), Ok(manufacturer), Ok(firmware)) => {
                self.observer.on_event(&SessionEvent::DeviceInfo {
                    name,
                    manufacturer,
                    firmware,
                });
            }
            _ => warn!("device info query failed"),
        }
    }
}
