//! Frame alignment, validation, and recovery over the shared byte buffer.

use log::{debug, info, trace};

use crate::buffer::ByteBuffer;
use crate::error::FrameError;
use crate::packet::{decode_header, Packet, HEADER_LEN};

/// Attempts to decode the frame at the front of a [`ByteBuffer`].
///
/// The framer never consumes bytes on failure. On success exactly the
/// validated frame's bytes are dropped before the packet is returned, so
/// every byte of the stream is either consumed as part of a valid frame or
/// dropped singly by the caller during resynchronisation.
#[derive(Debug, Default)]
pub struct Framer {
    decoded: u64,
    misaligned: u64,
    checksum_errors: u64,
}

impl Framer {
    /// Create a framer with zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to decode one frame at offset 0 of `buffer`.
    ///
    /// * `Ok(Some(packet))`: a frame validated; its bytes were consumed.
    /// * `Ok(None)`: underrun, fewer bytes than a header or than the frame
    ///   the header declares. Nothing consumed; wait for more data.
    /// * `Err(_)`: misalignment or checksum mismatch. Nothing consumed; the
    ///   caller drops one byte and retries from the next offset.
    pub fn poll(&mut self, buffer: &ByteBuffer) -> Result<Option<Packet>, FrameError> {
        if buffer.len() < HEADER_LEN {
            return Ok(None);
        }
        // The producer only appends, so the reads below cannot come up short
        // after the length checks.
        let Ok(header) = buffer.read(0, HEADER_LEN) else {
            return Ok(None);
        };
        let schema = decode_header(&header).map_err(|e| {
            self.misaligned += 1;
            trace!("resync: {e}");
            e
        })?;

        let total = schema.frame_len();
        if buffer.len() < total {
            return Ok(None);
        }
        let Ok(frame) = buffer.read(0, total) else {
            return Ok(None);
        };

        match Packet::decode(&frame) {
            Ok(packet) => {
                let _ = buffer.drop_front(total);
                self.decoded += 1;
                debug!("framed a {} packet ({total} bytes)", packet.packet_type());
                Ok(Some(packet))
            }
            Err(e @ FrameError::ChecksumMismatch { .. }) => {
                // Likely a false-positive header whose start/id/complement
                // coincided with payload data; keep searching byte by byte.
                self.checksum_errors += 1;
                Err(e)
            }
            Err(e @ FrameError::Misaligned(_)) => {
                self.misaligned += 1;
                Err(e)
            }
        }
    }

    /// Frames decoded over this framer's lifetime.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Offsets rejected for header inconsistencies.
    pub fn misaligned(&self) -> u64 {
        self.misaligned
    }

    /// Candidate frames rejected for checksum mismatches.
    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors
    }
}

impl Drop for Framer {
    fn drop(&mut self) {
        info!(
            "Framer: decoded {}, misaligned {}, checksum errors {}",
            self.decoded, self.misaligned, self.checksum_errors
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::error::MisalignedReason;
    use crate::field::FieldValue;
    use crate::schema::PacketType;
    use crate::testutil;

    /// Drive the framer with the decoder's resync policy: drop one byte on
    /// any error, stop at the first underrun.
    fn drain(framer: &mut Framer, buffer: &ByteBuffer) -> Vec<Packet> {
        let mut packets = Vec::new();
        loop {
            match framer.poll(buffer) {
                Ok(Some(packet)) => packets.push(packet),
                Ok(None) => return packets,
                Err(_) => buffer.drop_front(1).unwrap(),
            }
        }
    }

    #[test]
    fn underrun_below_header_length_leaves_buffer_alone() {
        let mut framer = Framer::new();
        let buffer = ByteBuffer::new();
        for byte in [0x01, 0x00, 0xFF] {
            assert!(matches!(framer.poll(&buffer), Ok(None)));
            buffer.push(byte);
        }
        assert!(matches!(framer.poll(&buffer), Ok(None)));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn underrun_with_footer_short_one_byte() {
        let frame = testutil::met_frame();
        let buffer = ByteBuffer::new();
        buffer.extend(&frame[..frame.len() - 1]);

        let mut framer = Framer::new();
        assert!(matches!(framer.poll(&buffer), Ok(None)));
        assert_eq!(buffer.len(), frame.len() - 1);

        // The last byte completes the frame.
        buffer.push(frame[frame.len() - 1]);
        let packet = framer.poll(&buffer).unwrap().unwrap();
        assert_eq!(packet.packet_type(), PacketType::Met);
        assert!(buffer.is_empty());
    }

    #[test]
    fn valid_met_frame_at_offset_zero() {
        let buffer = ByteBuffer::new();
        buffer.extend(&testutil::met_frame());

        let mut framer = Framer::new();
        let packet = framer.poll(&buffer).unwrap().unwrap();
        assert_eq!(packet.packet_type(), PacketType::Met);
        testutil::assert_float_field(&packet, "temperature", 25.0);
        testutil::assert_float_field(&packet, "rh", 0.5);
        testutil::assert_float_field(&packet, "pressure", 2000.0);
        assert!(buffer.is_empty());
        assert_eq!(framer.decoded(), 1);
    }

    #[test]
    fn prefix_garbage_is_dropped_byte_by_byte() {
        let buffer = ByteBuffer::new();
        buffer.extend(&[0x55, 0xAA, 0x00]);
        buffer.extend(&testutil::met_frame());

        let mut framer = Framer::new();
        for _ in 0..3 {
            assert!(matches!(
                framer.poll(&buffer),
                Err(FrameError::Misaligned(_))
            ));
            buffer.drop_front(1).unwrap();
        }
        let packet = framer.poll(&buffer).unwrap().unwrap();
        assert_eq!(packet.packet_type(), PacketType::Met);
        assert!(buffer.is_empty());
        assert_eq!(framer.misaligned(), 3);
    }

    #[test]
    fn corrupted_checksum_never_emits_and_drains_singly() {
        let mut frame = testutil::met_frame();
        *frame.last_mut().unwrap() ^= 0xFF;

        let buffer = ByteBuffer::new();
        buffer.extend(&frame);

        let mut framer = Framer::new();
        let packets = drain(&mut framer, &buffer);
        assert!(packets.is_empty());
        // Every offset was visited; only a sub-header tail remains.
        assert!(buffer.len() < HEADER_LEN);
        assert_eq!(framer.decoded(), 0);
        assert!(framer.checksum_errors() >= 1);
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let met = testutil::met_frame();
        let position = testutil::sample_packet(PacketType::Position)
            .encode()
            .unwrap();

        let buffer = ByteBuffer::new();
        buffer.extend(&met);
        buffer.extend(&position);
        assert_eq!(buffer.len(), met.len() + position.len());

        let mut framer = Framer::new();
        let packets = drain(&mut framer, &buffer);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].packet_type(), PacketType::Met);
        assert_eq!(packets[1].packet_type(), PacketType::Position);
        assert!(buffer.is_empty());
    }

    #[test]
    fn unknown_id_with_valid_complement_is_misaligned() {
        let buffer = ByteBuffer::new();
        buffer.extend(&[0x01, 0x02, 0xFD, 0x00]);

        let mut framer = Framer::new();
        assert_eq!(
            framer.poll(&buffer),
            Err(FrameError::Misaligned(MisalignedReason::UnknownId(0x02)))
        );
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn interleaved_garbage_conserves_every_byte() {
        let met = testutil::met_frame();
        let purge = testutil::sample_packet(PacketType::Purge).encode().unwrap();

        let buffer = ByteBuffer::new();
        buffer.extend(&[0xFE, 0x02]);
        buffer.extend(&met);
        buffer.extend(&[0x7F]);
        buffer.extend(&purge);

        let mut framer = Framer::new();
        let packets = drain(&mut framer, &buffer);

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].packet_type(), PacketType::Met);
        assert_eq!(packets[1].packet_type(), PacketType::Purge);
        assert_eq!(
            packets[1].get("flow"),
            Some(&FieldValue::Signed(-321))
        );
        // Three garbage bytes dropped singly, two frames consumed whole.
        assert!(buffer.is_empty());
        assert_eq!(framer.misaligned(), 3);
        assert_eq!(framer.decoded(), 2);
    }
}
