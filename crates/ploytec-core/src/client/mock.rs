//! Mock user client for testing.

use std::sync::Mutex;

use super::stats::PlaybackStats;
use super::traits::{ClientError, UserClient};

/// One recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Open,
    Close,
    GetFirmwareVersion,
    GetDeviceName,
    GetDeviceManufacturer,
    GetStats,
    SetUrbCount(u8),
    GetUrbCount,
    SetFrameCounts(u16, u16),
    GetInputFrameCount,
    GetOutputFrameCount,
    SetBufferSize(u32),
    SendMidiWord(u64),
}

#[derive(Debug)]
struct MockState {
    open_error: Option<String>,
    stats_error: bool,
    connected: bool,
    stats: PlaybackStats,
    urb_count: u8,
    input_frames: u16,
    output_frames: u16,
    calls: Vec<ClientCall>,
}

/// Mock user client for unit testing controller and bridge logic.
pub struct MockUserClient {
    state: Mutex<MockState>,
}

impl MockUserClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                open_error: None,
                stats_error: false,
                connected: false,
                stats: PlaybackStats::default(),
                urb_count: 8,
                input_frames: 80,
                output_frames: 80,
                calls: Vec::new(),
            }),
        }
    }

    /// While set, `open` fails with the given message.
    pub fn set_open_error(&self, message: Option<&str>) {
        self.state.lock().unwrap().open_error = message.map(str::to_string);
    }

    /// While set, `playback_stats` fails (simulates the device going away).
    pub fn set_stats_error(&self, fail: bool) {
        self.state.lock().unwrap().stats_error = fail;
    }

    pub fn set_stats(&self, stats: PlaybackStats) {
        self.state.lock().unwrap().stats = stats;
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// MIDI words handed to the write path, in order.
    pub fn sent_words(&self) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|c| match c {
                ClientCall::SendMidiWord(w) => Some(*w),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ClientCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Default for MockUserClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UserClient for MockUserClient {
    fn open(&self) -> Result<String, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Open);
        if let Some(message) = &state.open_error {
            return Err(ClientError::OpenFailed(message.clone()));
        }
        state.connected = true;
        Ok("mock connection opened".to_string())
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Close);
        state.connected = false;
    }

    fn firmware_version(&self) -> Result<String, ClientError> {
        self.record(ClientCall::GetFirmwareVersion);
        Ok("1.00".to_string())
    }

    fn device_name(&self) -> Result<String, ClientError> {
        self.record(ClientCall::GetDeviceName);
        Ok("Mock DB4".to_string())
    }

    fn device_manufacturer(&self) -> Result<String, ClientError> {
        self.record(ClientCall::GetDeviceManufacturer);
        Ok("Mockerman".to_string())
    }

    fn playback_stats(&self) -> Result<PlaybackStats, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::GetStats);
        if state.stats_error {
            return Err(ClientError::CallFailed {
                method: "playback_stats",
                message: "device gone".to_string(),
            });
        }
        Ok(state.stats)
    }

    fn set_urb_count(&self, count: u8) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::SetUrbCount(count));
        state.urb_count = count;
        Ok(())
    }

    fn urb_count(&self) -> Result<u8, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::GetUrbCount);
        Ok(state.urb_count)
    }

    fn set_frame_counts(&self, input: u16, output: u16) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::SetFrameCounts(input, output));
        state.input_frames = input;
        state.output_frames = output;
        Ok(())
    }

    fn input_frame_count(&self) -> Result<u16, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::GetInputFrameCount);
        Ok(state.input_frames)
    }

    fn output_frame_count(&self) -> Result<u16, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::GetOutputFrameCount);
        Ok(state.output_frames)
    }

    fn set_buffer_size(&self, bytes: u32) -> Result<(), ClientError> {
        self.record(ClientCall::SetBufferSize(bytes));
        Ok(())
    }

    fn send_midi_word(&self, word: u64) -> Result<(), ClientError> {
        self.record(ClientCall::SendMidiWord(word));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_call_capture() {
        let mock = MockUserClient::new();
        mock.open().unwrap();
        mock.set_urb_count(4).unwrap();
        mock.close();

        assert_eq!(
            mock.calls(),
            vec![
                ClientCall::Open,
                ClientCall::SetUrbCount(4),
                ClientCall::Close
            ]
        );
    }

    #[test]
    fn test_mock_open_error() {
        let mock = MockUserClient::new();
        mock.set_open_error(Some("no device"));
        assert!(matches!(mock.open(), Err(ClientError::OpenFailed(_))));

        mock.set_open_error(None);
        assert!(mock.open().is_ok());
    }

    #[test]
    fn test_mock_stats_error() {
        let mock = MockUserClient::new();
        assert!(mock.playback_stats().is_ok());
        mock.set_stats_error(true);
        assert!(mock.playback_stats().is_err());
    }
}
