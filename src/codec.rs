use bytes::{Buf, BytesMut};

use crate::error::AimmsError;
use crate::packet::{decode_header, Packet, HEADER_LEN};

#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "async-codec", feature = "tokio-codec")))
)]
/// A Codec used to Encode/Decode AIMMS-30 [Packet]s from Streams and Sinks.
///
/// The frame header doubles as the synchronisation marker: the codec sweeps
/// the input byte stream one byte at a time until a self-consistent header
/// with a matching checksum is found, then yields the decoded [Packet].
/// Corrupt or misaligned spans never abort the stream; they are skipped.
#[derive(Debug, Default)]
pub struct PacketCodec {
    skipped: u64,
}

impl PacketCodec {
    /// Create a codec aligned to nothing; alignment is recovered from the
    /// stream itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes skipped so far while hunting for frame starts.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn decode_helper(&mut self, buffer: &mut BytesMut) -> Result<Option<Packet>, AimmsError> {
        loop {
            if buffer.remaining() < HEADER_LEN {
                // Return None to indicate more data is needed
                return Ok(None);
            }

            let schema = match decode_header(buffer.as_ref()) {
                Ok(schema) => schema,
                Err(_) => {
                    buffer.advance(1);
                    self.skipped += 1;
                    continue;
                }
            };

            let frame_len = schema.frame_len();
            if buffer.remaining() < frame_len {
                // full frame has not yet arrived
                // reserve enough bytes so we can fit it in the buffer
                buffer.reserve(frame_len - buffer.remaining());
                return Ok(None);
            }

            match Packet::decode(&buffer.as_ref()[..frame_len]) {
                Ok(packet) => {
                    buffer.advance(frame_len);
                    return Ok(Some(packet));
                }
                // A checksum mismatch here means the header was a
                // false positive; resume the sweep one byte along.
                Err(_) => {
                    buffer.advance(1);
                    self.skipped += 1;
                }
            }
        }
    }

    fn encode_helper(&mut self, item: &Packet, dst: &mut BytesMut) -> Result<(), AimmsError> {
        let bytes = item.encode()?;
        dst.reserve(bytes.len());
        dst.extend(bytes);
        Ok(())
    }
}

#[cfg(feature = "async-codec")]
mod non_tokio {
    use super::*;

    use asynchronous_codec::{Decoder, Encoder};

    impl Decoder for PacketCodec {
        type Item = Packet;

        type Error = AimmsError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
            self.decode_helper(src)
        }
    }

    impl Encoder for PacketCodec {
        type Item = Packet;

        type Error = AimmsError;

        fn encode(
            &mut self,
            item: Self::Item,
            dst: &mut asynchronous_codec::BytesMut,
        ) -> Result<(), Self::Error> {
            self.encode_helper(&item, dst)
        }
    }
}

#[cfg(feature = "tokio-codec")]
mod tokio_codec {
    use tokio_util::codec::{Decoder, Encoder};

    use super::*;

    impl Decoder for PacketCodec {
        type Item = Packet;

        type Error = AimmsError;

        fn decode(&mut self, src: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
            self.decode_helper(src)
        }
    }

    impl Encoder<Packet> for PacketCodec {
        type Error = AimmsError;

        fn encode(&mut self, item: Packet, dst: &mut bytes::BytesMut) -> Result<(), Self::Error> {
            self.encode_helper(&item, dst)
        }
    }
}
