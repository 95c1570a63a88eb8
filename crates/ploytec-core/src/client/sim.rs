//! In-process driver simulator.
//!
//! Stands in for the privileged driver so the full pipeline (session
//! controller, MIDI bridge, stats polling) can run on a machine without the
//! extension installed. Counters live in the same 80-byte wire form the
//! driver keeps in its shared region; every access goes through the codec
//! in [`super::stats`].

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::debug;

use crate::codec;

use super::stats::PlaybackStats;
use super::traits::{ClientError, UserClient};

struct SimState {
    connected: bool,
    raw_stats: [u8; PlaybackStats::WIRE_SIZE],
    urb_count: u8,
    input_frames: u16,
    output_frames: u16,
    buffer_size: u32,
    /// Messages "sent to the hardware", queued for echo back to the host.
    echo: VecDeque<(u8, [u8; codec::MAX_MESSAGE_LEN])>,
}

/// Simulated user client. Echoes every MIDI word back as a
/// hardware-to-host notification payload retrievable via
/// [`SimUserClient::drain_midi_echo`].
pub struct SimUserClient {
    state: Mutex<SimState>,
}

impl SimUserClient {
    pub fn new() -> Self {
        let mut raw_stats = [0u8; PlaybackStats::WIRE_SIZE];
        raw_stats[..].copy_from_slice(&PlaybackStats::default().to_bytes());
        Self {
            state: Mutex::new(SimState {
                connected: false,
                raw_stats,
                urb_count: 8,
                input_frames: 80,
                output_frames: 80,
                buffer_size: 2560,
                echo: VecDeque::new(),
            }),
        }
    }

    /// Drain pending `(length, bytes)` notification payloads.
    pub fn drain_midi_echo(&self) -> Vec<(u8, [u8; codec::MAX_MESSAGE_LEN])> {
        self.state.lock().unwrap().echo.drain(..).collect()
    }

    fn with_stats(
        state: &mut SimState,
        update: impl FnOnce(&mut PlaybackStats),
    ) -> PlaybackStats {
        let mut stats =
            PlaybackStats::from_bytes(&state.raw_stats).expect("sim stats region is well-formed");
        update(&mut stats);
        state.raw_stats.copy_from_slice(&stats.to_bytes());
        stats
    }

    fn ensure_connected(state: &SimState) -> Result<(), ClientError> {
        if state.connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

impl Default for SimUserClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UserClient for SimUserClient {
    fn open(&self) -> Result<String, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.connected = true;
        Self::with_stats(&mut state, |stats| {
            stats.playing = true;
            stats.recording = true;
        });
        Ok("Connection to PloytecDriver opened (simulated)".to_string())
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        Self::with_stats(&mut state, |stats| {
            stats.playing = false;
            stats.recording = false;
        });
    }

    fn firmware_version(&self) -> Result<String, ClientError> {
        Ok("PLT-SIM 1.07".to_string())
    }

    fn device_name(&self) -> Result<String, ClientError> {
        Ok("Ploytec USB Audio (simulated)".to_string())
    }

    fn device_manufacturer(&self) -> Result<String, ClientError> {
        Ok("Ploytec GmbH".to_string())
    }

    fn playback_stats(&self) -> Result<PlaybackStats, ClientError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        let input_frames = state.input_frames as u64;
        let output_frames = state.output_frames as u64;
        // Advance the counters as a running device would, one USB
        // transfer per poll.
        let stats = Self::with_stats(&mut state, |stats| {
            stats.out_sample_time += output_frames;
            stats.out_sample_time_usb += output_frames;
            stats.in_sample_time += input_frames;
            stats.in_sample_time_usb += input_frames;
            stats.usb_pcm_out_frames += output_frames;
            stats.usb_pcm_in_frames += input_frames;
        });
        Ok(stats)
    }

    fn set_urb_count(&self, count: u8) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state.urb_count = count;
        Ok(())
    }

    fn urb_count(&self) -> Result<u8, ClientError> {
        let state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        Ok(state.urb_count)
    }

    fn set_frame_counts(&self, input: u16, output: u16) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state.input_frames = input;
        state.output_frames = output;
        Ok(())
    }

    fn input_frame_count(&self) -> Result<u16, ClientError> {
        let state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        Ok(state.input_frames)
    }

    fn output_frame_count(&self) -> Result<u16, ClientError> {
        let state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        Ok(state.output_frames)
    }

    fn set_buffer_size(&self, bytes: u32) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        state.buffer_size = bytes;
        Ok(())
    }

    fn send_midi_word(&self, word: u64) -> Result<(), ClientError> {
        let bytes = codec::decode(word).map_err(|e| ClientError::CallFailed {
            method: "send_midi_word",
            message: e.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        Self::ensure_connected(&state)?;
        debug!(word = format!("{word:#018x}"), len = bytes.len(), "sim MIDI out");
        let len = bytes.len() as u64;
        Self::with_stats(&mut state, |stats| {
            stats.usb_midi_out_bytes += len;
            stats.usb_midi_in_bytes += len;
        });
        let mut payload = [0u8; codec::MAX_MESSAGE_LEN];
        payload[..bytes.len()].copy_from_slice(&bytes);
        state.echo.push_back((bytes.len() as u8, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_requires_open() {
        let sim = SimUserClient::new();
        assert_eq!(sim.playback_stats(), Err(ClientError::NotConnected));

        sim.open().unwrap();
        assert!(sim.playback_stats().is_ok());

        sim.close();
        assert_eq!(sim.urb_count(), Err(ClientError::NotConnected));
    }

    #[test]
    fn test_sim_echoes_midi() {
        let sim = SimUserClient::new();
        sim.open().unwrap();

        let word = crate::codec::encode(&[0x90, 0x40, 0x7F]).unwrap();
        sim.send_midi_word(word).unwrap();

        let echo = sim.drain_midi_echo();
        assert_eq!(echo.len(), 1);
        assert_eq!(echo[0].0, 3);
        assert_eq!(&echo[0].1[..3], &[0x90, 0x40, 0x7F]);

        let stats = sim.playback_stats().unwrap();
        assert_eq!(stats.usb_midi_out_bytes, 3);
    }

    #[test]
    fn test_sim_counters_advance() {
        let sim = SimUserClient::new();
        sim.open().unwrap();

        let first = sim.playback_stats().unwrap();
        let second = sim.playback_stats().unwrap();
        assert!(second.usb_pcm_out_frames > first.usb_pcm_out_frames);
        assert!(second.playing);
    }
}
