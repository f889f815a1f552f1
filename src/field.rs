//! Leaf en/de-coders for the primitive field types of a packet body.
//!
//! Every codec reads and writes a fixed byte width; all multi-byte values
//! are little-endian on the wire.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::AimmsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
/// Sensor status bitfield carried by meteorology packets.
pub struct StatusFlags {
    /// Wind measurement valid.
    pub wind: bool,
    /// Purge cycle active.
    pub purge: bool,
    /// GPS lock acquired.
    pub gps: bool,
}

impl StatusFlags {
    const MASK_WIND: u8 = 1;
    const MASK_PURGE: u8 = 1 << 1;
    const MASK_GPS: u8 = 1 << 2;

    /// Expand the on-wire bitfield. Bits above bit 2 are reserved and ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            wind: bits & Self::MASK_WIND != 0,
            purge: bits & Self::MASK_PURGE != 0,
            gps: bits & Self::MASK_GPS != 0,
        }
    }

    /// Collapse back to the on-wire bitfield.
    pub fn to_bits(self) -> u8 {
        let mut bits = 0;
        if self.wind {
            bits |= Self::MASK_WIND;
        }
        if self.purge {
            bits |= Self::MASK_PURGE;
        }
        if self.gps {
            bits |= Self::MASK_GPS;
        }
        bits
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A decoded field value.
///
/// Unscaled integer fields keep their integer representation; scaled fields
/// and floats decode to [`Float`](Self::Float).
pub enum FieldValue {
    /// An unsigned integer field.
    Unsigned(u64),
    /// A two's-complement integer field.
    Signed(i64),
    /// A floating point or scaled-integer field.
    Float(f64),
    /// The status bitfield.
    Status(StatusFlags),
}

impl FieldValue {
    /// The value as an `f64`, for any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(v) => Some(*v as f64),
            Self::Signed(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Status(_) => None,
        }
    }

    /// The status flags, if this is a status field.
    pub fn as_status(&self) -> Option<StatusFlags> {
        match self {
            Self::Status(flags) => Some(*flags),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unsigned(_) => "unsigned integer",
            Self::Signed(_) => "signed integer",
            Self::Float(_) => "float",
            Self::Status(_) => "status",
        }
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unsigned(v) => serializer.serialize_u64(*v),
            Self::Signed(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Status(flags) => flags.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An integer codec usable as the base of a scaled field.
pub enum IntCodec {
    /// Raw unsigned byte.
    U8,
    /// Two's complement byte.
    I8,
    /// Little-endian unsigned 16-bit.
    U16,
    /// Little-endian two's complement 16-bit.
    I16,
}

impl IntCodec {
    /// Byte width of the encoded integer.
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
        }
    }

    fn decode_raw(self, bytes: &[u8]) -> i64 {
        match self {
            Self::U8 => bytes[0].into(),
            Self::I8 => (bytes[0] as i8).into(),
            Self::U16 => LittleEndian::read_u16(bytes).into(),
            Self::I16 => LittleEndian::read_i16(bytes).into(),
        }
    }

    fn encode_raw(self, raw: i64, out: &mut Vec<u8>) {
        match self {
            Self::U8 => out.push(raw as u8),
            Self::I8 => out.push(raw as i8 as u8),
            Self::U16 => out.extend((raw as u16).to_le_bytes()),
            Self::I16 => out.extend((raw as i16).to_le_bytes()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A field en/de-coder with a fixed byte width.
pub enum FieldCodec {
    /// Raw unsigned byte.
    U8,
    /// Two's complement byte.
    I8,
    /// Little-endian unsigned 16-bit.
    U16,
    /// Little-endian two's complement 16-bit.
    I16,
    /// Little-endian IEEE-754 single precision.
    F32,
    /// An integer codec whose decoded value is multiplied by a fixed factor.
    Scaled(IntCodec, f64),
    /// The status bitfield byte.
    Status,
}

impl FieldCodec {
    /// Byte width this codec reads and writes.
    pub const fn width(&self) -> usize {
        match self {
            Self::U8 | Self::I8 | Self::Status => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 => 4,
            Self::Scaled(base, _) => base.width(),
        }
    }

    /// Decode `bytes` into a value.
    ///
    /// The schema proves exactly [`width`](Self::width) bytes are available
    /// before any codec runs, so no length failure can arise here.
    pub fn decode(&self, bytes: &[u8]) -> FieldValue {
        debug_assert_eq!(bytes.len(), self.width());
        match self {
            Self::U8 => FieldValue::Unsigned(bytes[0].into()),
            Self::I8 => FieldValue::Signed((bytes[0] as i8).into()),
            Self::U16 => FieldValue::Unsigned(LittleEndian::read_u16(bytes).into()),
            Self::I16 => FieldValue::Signed(LittleEndian::read_i16(bytes).into()),
            Self::F32 => FieldValue::Float(LittleEndian::read_f32(bytes).into()),
            Self::Scaled(base, factor) => {
                FieldValue::Float(base.decode_raw(bytes) as f64 * factor)
            }
            Self::Status => FieldValue::Status(StatusFlags::from_bits(bytes[0])),
        }
    }

    /// Append the encoding of `value` to `out`.
    ///
    /// Scaled fields divide by the factor and round to the nearest integer,
    /// the inverse of [`decode`](Self::decode).
    pub fn encode(&self, value: &FieldValue, out: &mut Vec<u8>) -> Result<(), AimmsError> {
        match (self, value) {
            (Self::U8, FieldValue::Unsigned(v)) => out.push(*v as u8),
            (Self::U8, FieldValue::Signed(v)) => out.push(*v as u8),
            (Self::I8, FieldValue::Signed(v)) => out.push(*v as i8 as u8),
            (Self::I8, FieldValue::Unsigned(v)) => out.push(*v as i8 as u8),
            (Self::U16, FieldValue::Unsigned(v)) => out.extend((*v as u16).to_le_bytes()),
            (Self::U16, FieldValue::Signed(v)) => out.extend((*v as u16).to_le_bytes()),
            (Self::I16, FieldValue::Signed(v)) => out.extend((*v as i16).to_le_bytes()),
            (Self::I16, FieldValue::Unsigned(v)) => out.extend((*v as i16).to_le_bytes()),
            (Self::F32, FieldValue::Float(v)) => {
                out.extend((*v as f32).to_le_bytes());
            }
            (Self::Scaled(base, factor), FieldValue::Float(v)) => {
                base.encode_raw((v / factor).round() as i64, out);
            }
            (Self::Status, FieldValue::Status(flags)) => out.push(flags.to_bits()),
            (codec, value) => {
                return Err(AimmsError::FieldType {
                    expected: codec.name(),
                    got: value.kind(),
                })
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::I8 => "I8",
            Self::U16 => "U16",
            Self::I16 => "I16",
            Self::F32 => "F32",
            Self::Scaled(..) => "a scaled integer",
            Self::Status => "the status bitfield",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(FieldCodec::U8, 1)]
    #[case(FieldCodec::I8, 1)]
    #[case(FieldCodec::U16, 2)]
    #[case(FieldCodec::I16, 2)]
    #[case(FieldCodec::F32, 4)]
    #[case(FieldCodec::Scaled(IntCodec::I16, 0.01), 2)]
    #[case(FieldCodec::Scaled(IntCodec::U16, 0.001), 2)]
    #[case(FieldCodec::Status, 1)]
    fn widths(#[case] codec: FieldCodec, #[case] expected: usize) {
        assert_eq!(codec.width(), expected);
    }

    #[rstest]
    #[case(FieldCodec::U8, &[0xFE], FieldValue::Unsigned(254))]
    #[case(FieldCodec::I8, &[0xFE], FieldValue::Signed(-2))]
    #[case(FieldCodec::U16, &[0x34, 0x12], FieldValue::Unsigned(0x1234))]
    #[case(FieldCodec::I16, &[0x18, 0xFC], FieldValue::Signed(-1000))]
    #[case(FieldCodec::Scaled(IntCodec::I16, 0.01), &[0xC4, 0x09], FieldValue::Float(25.0))]
    #[case(FieldCodec::Scaled(IntCodec::U16, 0.001), &[0xF4, 0x01], FieldValue::Float(0.5))]
    #[case(FieldCodec::Scaled(IntCodec::U16, 2.0), &[0xE8, 0x03], FieldValue::Float(2000.0))]
    fn decode_known_values(
        #[case] codec: FieldCodec,
        #[case] bytes: &[u8],
        #[case] expected: FieldValue,
    ) {
        assert_eq!(codec.decode(bytes), expected);
    }

    #[test]
    fn f32_little_endian() {
        let bytes = 42.5_f32.to_le_bytes();
        match FieldCodec::F32.decode(&bytes) {
            FieldValue::Float(v) => assert!((v - 42.5).abs() < 1e-9),
            other => panic!("expected a float, got {other:?}"),
        }
    }

    #[rstest]
    #[case(FieldCodec::U8, FieldValue::Unsigned(200))]
    #[case(FieldCodec::I8, FieldValue::Signed(-100))]
    #[case(FieldCodec::U16, FieldValue::Unsigned(40_000))]
    #[case(FieldCodec::I16, FieldValue::Signed(-30_000))]
    #[case(FieldCodec::Scaled(IntCodec::I16, 0.01), FieldValue::Float(-123.45))]
    #[case(FieldCodec::Scaled(IntCodec::I16, 0.02), FieldValue::Float(90.0))]
    #[case(FieldCodec::Scaled(IntCodec::U16, 0.001), FieldValue::Float(0.775))]
    fn roundtrip(#[case] codec: FieldCodec, #[case] value: FieldValue) {
        let mut encoded = Vec::new();
        codec.encode(&value, &mut encoded).unwrap();
        assert_eq!(encoded.len(), codec.width());

        let recovered = codec.decode(&encoded);
        let (a, b) = (value.as_f64().unwrap(), recovered.as_f64().unwrap());
        assert!((a - b).abs() < 1e-9, "{a} did not survive the roundtrip: {b}");
    }

    #[test]
    fn status_flags_bits() {
        let flags = StatusFlags::from_bits(0x05);
        assert!(flags.wind);
        assert!(!flags.purge);
        assert!(flags.gps);
        assert_eq!(flags.to_bits(), 0x05);

        // Reserved bits are dropped on the way through.
        assert_eq!(StatusFlags::from_bits(0xF8), StatusFlags::default());
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let mut out = Vec::new();
        let status = FieldValue::Status(StatusFlags::default());
        assert!(FieldCodec::U16.encode(&status, &mut out).is_err());
        assert!(FieldCodec::F32
            .encode(&FieldValue::Unsigned(1), &mut out)
            .is_err());
        assert!(out.is_empty());
    }
}
