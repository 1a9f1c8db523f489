//! # UBX Frame Decoder
//!
//! Byte-at-a-time state machine turning a raw serial stream into
//! checksum-verified UBX frames.
//!
//! The decoder never blocks and never needs more than one byte to make
//! progress, so it can be fed straight from a serial receive loop. Any
//! framing problem (bad sync, absurd length, checksum mismatch) is counted
//! and the decoder resynchronizes on the next `0xB5 0x62` pair.

use tracing::debug;

use super::checksum::update_byte;
use super::protocol::*;

/// Decoder position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    SeekSync1,
    SeekSync2,
    ReadClass,
    ReadId,
    ReadLenLo,
    ReadLenHi,
    ReadPayload,
    VerifyCkA,
    VerifyCkB,
}

/// Cumulative decoder counters
///
/// Monotonic; only a full engine restart resets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames whose checksum verified
    pub packet_count: u64,

    /// Checksum failures and oversize-length aborts
    pub errors: u64,
}

/// Resumable UBX frame decoder
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecoderState,
    class: u8,
    id: u8,
    length: u16,
    cursor: usize,
    ck_a: u8,
    ck_b: u8,
    buffer: [u8; UBX_MAX_PAYLOAD_SIZE],
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder waiting for the first sync byte
    pub fn new() -> Self {
        Self {
            state: DecoderState::SeekSync1,
            class: 0,
            id: 0,
            length: 0,
            cursor: 0,
            ck_a: 0,
            ck_b: 0,
            buffer: [0u8; UBX_MAX_PAYLOAD_SIZE],
            stats: DecoderStats::default(),
        }
    }

    /// Current state machine position
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Cumulative counters
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Drop any partially decoded frame and seek the next sync byte
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        self.state = DecoderState::SeekSync1;
        self.cursor = 0;
        self.length = 0;
    }

    /// Consume one byte
    ///
    /// # Arguments
    ///
    /// * `byte` - Next byte from the serial stream
    ///
    /// # Returns
    ///
    /// * `Option<RawFrame>` - A frame when this byte completed a frame whose
    ///   both checksum bytes verified, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use ubx_nav::ubx::decoder::FrameDecoder;
    ///
    /// let mut decoder = FrameDecoder::new();
    /// let bytes = [0xB5, 0x62, 0x0A, 0x04, 0x00, 0x00, 0x0E, 0x34];
    ///
    /// let mut frames = 0;
    /// for &b in &bytes {
    ///     if let Some(frame) = decoder.feed(b) {
    ///         assert_eq!((frame.class, frame.id), (0x0A, 0x04));
    ///         frames += 1;
    ///     }
    /// }
    /// assert_eq!(frames, 1);
    /// ```
    pub fn feed(&mut self, byte: u8) -> Option<RawFrame<'_>> {
        let mut complete = false;

        match self.state {
            DecoderState::SeekSync1 => {
                if byte == UBX_SYNC_1 {
                    self.state = DecoderState::SeekSync2;
                }
            }
            DecoderState::SeekSync2 => {
                // A repeated 0xB5 may itself start the frame
                self.state = match byte {
                    UBX_SYNC_2 => DecoderState::ReadClass,
                    UBX_SYNC_1 => DecoderState::SeekSync2,
                    _ => DecoderState::SeekSync1,
                };
            }
            DecoderState::ReadClass => {
                self.class = byte;
                // Class byte seeds both accumulators
                self.ck_a = byte;
                self.ck_b = byte;
                self.state = DecoderState::ReadId;
            }
            DecoderState::ReadId => {
                self.accumulate(byte);
                self.id = byte;
                self.state = DecoderState::ReadLenLo;
            }
            DecoderState::ReadLenLo => {
                self.accumulate(byte);
                self.length = u16::from(byte);
                self.state = DecoderState::ReadLenHi;
            }
            DecoderState::ReadLenHi => {
                self.accumulate(byte);
                self.length |= u16::from(byte) << 8;

                if usize::from(self.length) > UBX_MAX_PAYLOAD_SIZE {
                    debug!(
                        "Dropping UBX 0x{:02X}/0x{:02X}: declared length {} exceeds {}",
                        self.class, self.id, self.length, UBX_MAX_PAYLOAD_SIZE
                    );
                    self.stats.errors += 1;
                    self.state = DecoderState::SeekSync1;
                } else {
                    self.cursor = 0;
                    self.state = if self.length == 0 {
                        DecoderState::VerifyCkA
                    } else {
                        DecoderState::ReadPayload
                    };
                }
            }
            DecoderState::ReadPayload => {
                self.accumulate(byte);
                if self.cursor < UBX_MAX_PAYLOAD_SIZE {
                    self.buffer[self.cursor] = byte;
                }
                self.cursor += 1;
                if self.cursor >= usize::from(self.length) {
                    self.state = DecoderState::VerifyCkA;
                }
            }
            DecoderState::VerifyCkA => {
                if byte == self.ck_a {
                    self.state = DecoderState::VerifyCkB;
                } else {
                    self.stats.errors += 1;
                    self.state = DecoderState::SeekSync1;
                }
            }
            DecoderState::VerifyCkB => {
                self.state = DecoderState::SeekSync1;

                if byte != self.ck_b {
                    self.stats.errors += 1;
                } else {
                    self.stats.packet_count += 1;
                    complete = true;
                }
            }
        }

        if complete {
            Some(self.frame())
        } else {
            None
        }
    }

    #[inline]
    fn accumulate(&mut self, byte: u8) {
        (self.ck_a, self.ck_b) = update_byte(byte, self.ck_a, self.ck_b);
    }

    fn frame(&self) -> RawFrame<'_> {
        let len = usize::from(self.length).min(UBX_MAX_PAYLOAD_SIZE);
        RawFrame {
            class: self.class,
            id: self.id,
            declared_length: self.length,
            payload: &self.buffer[..len],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubx::encoder::build_frame;

    /// Feed all bytes, collecting `(class, id, payload)` of every emitted frame
    fn decode_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<(u8, u8, Vec<u8>)> {
        let mut frames = Vec::new();
        for &b in bytes {
            if let Some(frame) = decoder.feed(b) {
                frames.push((frame.class, frame.id, frame.payload.to_vec()));
            }
        }
        frames
    }

    #[test]
    fn test_decode_valid_frame() {
        let payload = [1u8, 2, 3, 4, 5];
        let bytes = build_frame(CLASS_NAV, MSG_NAV_STATUS, &payload);

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames, vec![(CLASS_NAV, MSG_NAV_STATUS, payload.to_vec())]);
        assert_eq!(decoder.stats(), DecoderStats { packet_count: 1, errors: 0 });
        assert_eq!(decoder.state(), DecoderState::SeekSync1);
    }

    #[test]
    fn test_decode_zero_length_frame() {
        let bytes = build_frame(CLASS_MON, MSG_MON_VER, &[]);
        assert_eq!(bytes.len(), 8);

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames, vec![(CLASS_MON, MSG_MON_VER, vec![])]);
    }

    #[test]
    fn test_decode_rejects_corrupted_payload() {
        let payload: Vec<u8> = (0..40).collect();
        let clean = build_frame(CLASS_NAV, MSG_NAV_VELNED, &payload);

        for index in 6..6 + payload.len() {
            let mut corrupted = clean.clone();
            corrupted[index] ^= 0x5A;

            let mut decoder = FrameDecoder::new();
            let frames = decode_all(&mut decoder, &corrupted);

            assert!(frames.is_empty(), "corruption at {} was accepted", index);
            assert_eq!(decoder.stats().errors, 1);
        }
    }

    #[test]
    fn test_decode_ck_b_mismatch_counts_error() {
        let mut bytes = build_frame(CLASS_NAV, MSG_NAV_POSLLH, &[0u8; 28]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let mut decoder = FrameDecoder::new();
        assert!(decode_all(&mut decoder, &bytes).is_empty());
        assert_eq!(decoder.stats(), DecoderStats { packet_count: 0, errors: 1 });
    }

    #[test]
    fn test_resync_after_garbage() {
        let payload = [0xAA, 0xBB, 0xCC];
        let mut bytes = vec![0x00, 0x13, 0xB5, 0x00, 0x62, 0xFF, 0xB5, 0xB5];
        bytes.extend(build_frame(CLASS_NAV, MSG_NAV_TIMEUTC, &payload));

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames, vec![(CLASS_NAV, MSG_NAV_TIMEUTC, payload.to_vec())]);
        assert_eq!(decoder.stats().packet_count, 1);
    }

    #[test]
    fn test_resync_when_garbage_ends_in_sync_byte() {
        let payload = [0xAA, 0xBB, 0xCC];
        let mut bytes = vec![0x00, 0x13, UBX_SYNC_1];
        bytes.extend(build_frame(CLASS_NAV, MSG_NAV_TIMEUTC, &payload));

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames, vec![(CLASS_NAV, MSG_NAV_TIMEUTC, payload.to_vec())]);
        assert_eq!(decoder.stats(), DecoderStats { packet_count: 1, errors: 0 });
    }

    #[test]
    fn test_repeated_sync_byte_keeps_waiting() {
        let mut decoder = FrameDecoder::new();
        for _ in 0..3 {
            assert!(decoder.feed(UBX_SYNC_1).is_none());
            assert_eq!(decoder.state(), DecoderState::SeekSync2);
        }
        decoder.feed(UBX_SYNC_2);
        assert_eq!(decoder.state(), DecoderState::ReadClass);
    }

    #[test]
    fn test_oversize_length_is_abandoned() {
        // Declared length 257, followed by plenty of bytes
        let mut bytes = vec![UBX_SYNC_1, UBX_SYNC_2, CLASS_NAV, MSG_NAV_PVT, 0x01, 0x01];
        bytes.extend(std::iter::repeat(0x00).take(300));

        let mut decoder = FrameDecoder::new();
        assert!(decode_all(&mut decoder, &bytes).is_empty());
        assert_eq!(decoder.stats(), DecoderStats { packet_count: 0, errors: 1 });
    }

    #[test]
    fn test_oversize_then_valid_frame() {
        let mut bytes = vec![UBX_SYNC_1, UBX_SYNC_2, CLASS_NAV, MSG_NAV_PVT, 0xFF, 0xFF];
        bytes.extend(build_frame(CLASS_ACK, MSG_ACK_ACK, &[CLASS_CFG, MSG_CFG_MSG]));

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames, vec![(CLASS_ACK, MSG_ACK_ACK, vec![CLASS_CFG, MSG_CFG_MSG])]);
        assert_eq!(decoder.stats(), DecoderStats { packet_count: 1, errors: 1 });
    }

    #[test]
    fn test_max_payload_accepted() {
        let payload = vec![0x42u8; UBX_MAX_PAYLOAD_SIZE];
        let bytes = build_frame(CLASS_MON, MSG_MON_VER, &payload);

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].2.len(), UBX_MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut bytes = build_frame(CLASS_NAV, MSG_NAV_POSLLH, &[1; 28]);
        bytes.extend(build_frame(CLASS_NAV, MSG_NAV_VELNED, &[2; 36]));
        bytes.extend(build_frame(CLASS_ACK, MSG_ACK_NACK, &[CLASS_CFG, MSG_CFG_SBAS]));

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        let ids: Vec<_> = frames.iter().map(|f| (f.0, f.1)).collect();
        assert_eq!(
            ids,
            vec![
                (CLASS_NAV, MSG_NAV_POSLLH),
                (CLASS_NAV, MSG_NAV_VELNED),
                (CLASS_ACK, MSG_ACK_NACK),
            ]
        );
        assert_eq!(decoder.stats().packet_count, 3);
    }

    #[test]
    fn test_split_feeding_matches_whole() {
        // Interleaving with other work between bytes must not matter
        let bytes = build_frame(CLASS_NAV, MSG_NAV_SOL, &[7u8; 52]);
        let mut decoder = FrameDecoder::new();

        let mut seen = None;
        for (i, &b) in bytes.iter().enumerate() {
            let done = decoder.feed(b).map(|f| f.payload.len());
            if i + 1 < bytes.len() {
                assert!(done.is_none());
                assert_ne!(decoder.state(), DecoderState::SeekSync1);
            } else {
                seen = done;
            }
        }
        assert_eq!(seen, Some(52));
    }

    #[test]
    fn test_end_to_end_posllh_bytes() {
        let mut payload = [0u8; 28];
        payload[4..8].copy_from_slice(&1_234_567i32.to_le_bytes());
        payload[8..12].copy_from_slice(&(-7_654_321i32).to_le_bytes());
        payload[16..20].copy_from_slice(&100_000i32.to_le_bytes());

        let mut bytes = vec![0xB5, 0x62, 0x01, 0x02, 0x1C, 0x00];
        bytes.extend_from_slice(&payload);
        let (ck_a, ck_b) = crate::ubx::checksum::ubx_checksum(&bytes[2..]);
        bytes.push(ck_a);
        bytes.push(ck_b);

        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &bytes);

        assert_eq!(frames, vec![(CLASS_NAV, MSG_NAV_POSLLH, payload.to_vec())]);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let bytes = build_frame(CLASS_NAV, MSG_NAV_STATUS, &[0u8; 16]);
        let mut decoder = FrameDecoder::new();

        for &b in &bytes[..10] {
            assert!(decoder.feed(b).is_none());
        }
        decoder.reset();
        assert_eq!(decoder.state(), DecoderState::SeekSync1);

        // The tail of the interrupted frame is just noise now
        assert!(decode_all(&mut decoder, &bytes[10..]).is_empty());
        assert_eq!(decode_all(&mut decoder, &bytes).len(), 1);
    }
}
