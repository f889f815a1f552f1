//! AIMMS-30 packet definition and frame en/de-coding.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{AimmsError, FrameError, MisalignedReason};
use crate::field::FieldValue;
use crate::schema::{self, PacketType, Schema};

/// Frame header length: start byte, id, id complement, body length.
pub const HEADER_LEN: usize = 4;
/// Frame footer length: the little-endian 16-bit checksum.
pub const FOOTER_LEN: usize = 2;
/// First byte of every frame. The operations manual writes "= 1"; the
/// observed wire traffic carries the literal byte `0x01`.
pub const START_BYTE: u8 = 0x01;

/// 16-bit additive checksum over `bytes`, modulo 2^16.
///
/// Covers the start byte through the last body byte; the two footer bytes
/// are excluded.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
}

/// Validate a 4-byte frame header and return the schema it names.
///
/// All four header invariants are checked: start byte, id/complement pair,
/// known id, and `body_length` equal to the schema's declared length. Any
/// violation classifies the offset as misaligned.
pub fn decode_header(bytes: &[u8]) -> Result<&'static Schema, FrameError> {
    debug_assert!(bytes.len() >= HEADER_LEN);
    let (start, id, complement, body_len) = (bytes[0], bytes[1], bytes[2], bytes[3]);

    if start != START_BYTE {
        return Err(FrameError::Misaligned(MisalignedReason::BadStart(start)));
    }
    if complement != 255 - id {
        return Err(FrameError::Misaligned(MisalignedReason::BadComplement {
            id,
            complement,
        }));
    }
    let schema =
        schema::lookup(id).ok_or(FrameError::Misaligned(MisalignedReason::UnknownId(id)))?;
    if body_len != schema.body_len {
        return Err(FrameError::Misaligned(MisalignedReason::BadBodyLength {
            id,
            declared: body_len,
            expected: schema.body_len,
        }));
    }
    Ok(schema)
}

/// Encode the frame header for a schema.
pub fn encode_header(schema: &Schema) -> [u8; HEADER_LEN] {
    let id = schema.packet_type.id();
    [START_BYTE, id, 255 - id, schema.body_len]
}

#[derive(Debug, Clone, PartialEq)]
/// A decoded telemetry packet: a type tag and its named field values.
///
/// Packets are self-contained values; nothing in them borrows from the byte
/// stream they were framed out of.
pub struct Packet {
    packet_type: PacketType,
    fields: Vec<(&'static str, FieldValue)>,
    good_checksum: bool,
}

impl Packet {
    /// Assemble a packet from field values, e.g. for encoding.
    ///
    /// Values are surfaced as given; [`encode`](Self::encode) checks them
    /// against the schema.
    pub fn new(packet_type: PacketType, fields: Vec<(&'static str, FieldValue)>) -> Self {
        Self {
            packet_type,
            fields,
            good_checksum: true,
        }
    }

    /// The packet's type tag.
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Whether the frame checksum validated. Always true for packets
    /// surfaced by the framer; bad-checksum frames are never emitted.
    pub fn good_checksum(&self) -> bool {
        self.good_checksum
    }

    /// Look up a field value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Iterate the fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// Decode a complete frame: header, body, and checksum footer.
    ///
    /// The caller supplies exactly the bytes of one candidate frame; the
    /// framer proves the length before calling. Header invariants and the
    /// checksum are verified here.
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        let schema = decode_header(frame)?;
        debug_assert!(frame.len() >= schema.frame_len());

        let body_end = HEADER_LEN + schema.body_len as usize;
        let computed = checksum(&frame[..body_end]);
        let expected = LittleEndian::read_u16(&frame[body_end..body_end + FOOTER_LEN]);
        if computed != expected {
            return Err(FrameError::ChecksumMismatch { expected, computed });
        }

        let mut fields = Vec::with_capacity(schema.fields.len());
        for spec in schema.fields {
            let start = HEADER_LEN + spec.offset;
            let value = spec.codec.decode(&frame[start..start + spec.codec.width()]);
            fields.push((spec.name, value));
        }

        Ok(Self {
            packet_type: schema.packet_type,
            fields,
            good_checksum: true,
        })
    }

    /// Encode the packet to a complete on-wire frame.
    ///
    /// Field tables are contiguous and ordered, so encoding in schema order
    /// lands every field at its declared offset.
    pub fn encode(&self) -> Result<Vec<u8>, AimmsError> {
        let schema = self.packet_type.schema();
        let mut frame = Vec::with_capacity(schema.frame_len());
        frame.extend(encode_header(schema));
        for spec in schema.fields {
            let value = self.get(spec.name).ok_or(AimmsError::MissingField {
                field: spec.name,
                tag: schema.packet_type.tag(),
            })?;
            spec.codec.encode(value, &mut frame)?;
        }
        let sum = checksum(&frame);
        frame.extend(sum.to_le_bytes());
        Ok(frame)
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for Packet {
    /// Serializes to a flat map: `type` tag first, the fields in schema
    /// order, then `good_checksum`.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("type", self.packet_type.tag())?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("good_checksum", &self.good_checksum)?;
        map.end()
    }
}
