//! BLE MIDI framing.
//!
//! A BLE MIDI notification carries at most 20 bytes (default ATT MTU of 23
//! minus the 3-byte ATT header). Each frame starts with a header byte that
//! encodes the high bits of a 13-bit timestamp; the bridge does not track
//! timestamps, so every frame uses the fixed header `0x80`.
//!
//! ```text
//! ┌────────┬──────────────────────────┐
//! │ Header │  MIDI bytes (≤ 19)       │
//! │ 0x80   │                          │
//! └────────┴──────────────────────────┘
//! ```

/// Standard BLE MIDI service UUID.
pub const MIDI_SERVICE_UUID: u128 = 0x03b80e5a_ede8_4b33_a751_6ce34ec4c700;

/// Standard BLE MIDI I/O characteristic UUID.
pub const MIDI_CHARACTERISTIC_UUID: u128 = 0x7772e5db_3868_4112_a1a9_f2669d106bf3;

/// Maximum size of one notification (header + payload).
pub const MAX_FRAME_SIZE: usize = 20;

/// Header byte placed in front of every frame: high bit set, timestamp zero.
pub const FRAME_HEADER: u8 = 0x80;

/// Payload bytes available per frame after the header.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - 1;

/// One BLE MIDI notification, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleFrame {
    bytes: Vec<u8>,
}

impl BleFrame {
    fn new(payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(FRAME_HEADER);
        bytes.extend_from_slice(payload);
        Self { bytes }
    }

    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// Wire bytes of the frame, as written to the characteristic.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total size including the header byte.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Agrees with [`len`](Self::len): a frame always holds its header,
    /// so this is never true for frames built by [`frame_message`].
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Split a MIDI message into BLE frames of at most 20 bytes each.
///
/// Frames are returned in message order. An empty message produces no frames.
pub fn frame_message(data: &[u8]) -> Vec<BleFrame> {
    data.chunks(MAX_PAYLOAD_SIZE).map(BleFrame::new).collect()
}

/// Concatenate frame payloads back into the original message.
pub fn reassemble(frames: &[BleFrame]) -> Vec<u8> {
    frames.iter().flat_map(|f| f.payload().iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_single_frame() {
        let frames = frame_message(&[0x90, 60, 100]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[0x80, 0x90, 60, 100]);
    }

    #[test]
    fn test_exactly_nineteen_bytes_fits_one_frame() {
        let data: Vec<u8> = (0..19).collect();
        let frames = frame_message(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_twenty_bytes_splits() {
        let data: Vec<u8> = (0..20).collect();
        let frames = frame_message(&data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_bytes(), &[0x80, 19]);
    }

    #[test]
    fn test_len_counts_header() {
        let frames = frame_message(&[0xF8]);
        assert_eq!(frames[0].len(), 2);
        assert_eq!(frames[0].payload().len(), 1);
        assert!(!frames[0].is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(frame_message(&[]).is_empty());
    }

    #[test]
    fn test_every_frame_headered() {
        let data = vec![0x42; 100];
        for frame in frame_message(&data) {
            assert_eq!(frame.header(), FRAME_HEADER);
            assert!(frame.len() <= MAX_FRAME_SIZE);
        }
    }
}
