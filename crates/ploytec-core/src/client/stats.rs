//! Playback statistics shared with the driver.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::traits::ClientError;

/// Counters reported by the driver.
///
/// Sample times are tracked in two clock domains per direction: the audio
/// clock (`*_sample_time`) and the USB frame clock (`*_sample_time_usb`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub playing: bool,
    pub recording: bool,
    pub out_sample_time: u64,
    pub out_sample_time_usb: u64,
    pub in_sample_time: u64,
    pub in_sample_time_usb: u64,
    pub usb_pcm_out_frames: u64,
    pub usb_pcm_in_frames: u64,
    pub usb_midi_out_bytes: u64,
    pub usb_midi_in_bytes: u64,
    pub xruns: u64,
}

impl PlaybackStats {
    /// Size of the wire struct: two flag bytes, six bytes of padding, nine
    /// 64-bit counters. Matches the C layout in the driver's shared header.
    pub const WIRE_SIZE: usize = 80;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_SIZE);
        buf.push(self.playing as u8);
        buf.push(self.recording as u8);
        buf.extend_from_slice(&[0u8; 6]);
        buf.write_u64::<LittleEndian>(self.out_sample_time).unwrap();
        buf.write_u64::<LittleEndian>(self.out_sample_time_usb)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.in_sample_time).unwrap();
        buf.write_u64::<LittleEndian>(self.in_sample_time_usb)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.usb_pcm_out_frames)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.usb_pcm_in_frames)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.usb_midi_out_bytes)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.usb_midi_in_bytes)
            .unwrap();
        buf.write_u64::<LittleEndian>(self.xruns).unwrap();
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ClientError> {
        if data.len() < Self::WIRE_SIZE {
            return Err(ClientError::ShortBuffer {
                expected: Self::WIRE_SIZE,
                actual: data.len(),
            });
        }
        let playing = data[0] != 0;
        let recording = data[1] != 0;
        let mut cursor = Cursor::new(&data[8..]);
        Ok(Self {
            playing,
            recording,
            out_sample_time: cursor.read_u64::<LittleEndian>()?,
            out_sample_time_usb: cursor.read_u64::<LittleEndian>()?,
            in_sample_time: cursor.read_u64::<LittleEndian>()?,
            in_sample_time_usb: cursor.read_u64::<LittleEndian>()?,
            usb_pcm_out_frames: cursor.read_u64::<LittleEndian>()?,
            usb_pcm_in_frames: cursor.read_u64::<LittleEndian>()?,
            usb_midi_out_bytes: cursor.read_u64::<LittleEndian>()?,
            usb_midi_in_bytes: cursor.read_u64::<LittleEndian>()?,
            xruns: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::CallFailed {
            method: "stats decode",
            message: err.to_string(),
        }
    }
}
