//! Static body layouts for the four packet types.
//!
//! Layouts transcribe the AIMMS-30 operations manual: each schema is an
//! ordered field table of `(name, offset from body start, codec)`. Frame
//! offsets are `HEADER_LEN` plus the body offset.

use crate::field::{FieldCodec, IntCodec};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
/// The packet types the sensor emits, tagged by wire id.
pub enum PacketType {
    /// Standard meteorology packet.
    Met = 0,
    /// Aircraft state (position/attitude) packet.
    Position = 1,
    /// Purge flow packet.
    Purge = 4,
    /// Probe temperature packet.
    Temp = 5,
}

impl PacketType {
    /// Every known packet type, in wire-id order.
    pub const ALL: [PacketType; 4] = [Self::Met, Self::Position, Self::Purge, Self::Temp];

    /// Map a wire id to a packet type. Unknown ids are an explicit `None`,
    /// never a silent fallthrough.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Met),
            1 => Some(Self::Position),
            4 => Some(Self::Purge),
            5 => Some(Self::Temp),
            _ => None,
        }
    }

    /// The wire id carried in the frame header.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Short lowercase tag used in logs, JSON records, and HTTP paths.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Met => "met",
            Self::Position => "position",
            Self::Purge => "purge",
            Self::Temp => "temp",
        }
    }

    /// Parse a [`tag`](Self::tag) back to a packet type.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// The body layout for this packet type.
    pub fn schema(self) -> &'static Schema {
        match self {
            Self::Met => &MET,
            Self::Position => &POSITION,
            Self::Purge => &PURGE,
            Self::Temp => &TEMP,
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// One field of a packet body.
pub struct FieldSpec {
    /// Field name, as surfaced on decoded packets.
    pub name: &'static str,
    /// Byte offset from the start of the body.
    pub offset: usize,
    /// Codec for the field's bytes.
    pub codec: FieldCodec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// The declared body layout for one packet id.
pub struct Schema {
    /// Packet type this layout belongs to.
    pub packet_type: PacketType,
    /// Declared body length; the header's `body_length` must equal this.
    pub body_len: u8,
    /// Ordered field table.
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Total on-wire frame length: header, body, and checksum footer.
    pub fn frame_len(&self) -> usize {
        crate::packet::HEADER_LEN + self.body_len as usize + crate::packet::FOOTER_LEN
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Schema lookup by wire id.
pub fn lookup(id: u8) -> Option<&'static Schema> {
    PacketType::from_id(id).map(PacketType::schema)
}

const fn field(name: &'static str, offset: usize, codec: FieldCodec) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        codec,
    }
}

const CENTI_I16: FieldCodec = FieldCodec::Scaled(IntCodec::I16, 0.01);

/// Standard meteorology packet, id 0.
pub static MET: Schema = Schema {
    packet_type: PacketType::Met,
    body_len: 18,
    fields: &[
        field("utc_hours", 0, FieldCodec::U8),
        field("utc_minutes", 1, FieldCodec::U8),
        field("utc_seconds", 2, FieldCodec::U8),
        field("temperature", 3, CENTI_I16),
        field("rh", 5, FieldCodec::Scaled(IntCodec::U16, 0.001)),
        field("pressure", 7, FieldCodec::Scaled(IntCodec::U16, 2.0)),
        field("wind_vector_north", 9, CENTI_I16),
        field("wind_vector_east", 11, CENTI_I16),
        field("wind_speed", 13, CENTI_I16),
        field("wind_direction", 15, FieldCodec::Scaled(IntCodec::U16, 0.01)),
        field("status", 17, FieldCodec::Status),
    ],
};

/// Aircraft state packet, id 1.
pub static POSITION: Schema = Schema {
    packet_type: PacketType::Position,
    body_len: 35,
    fields: &[
        field("utc_hours", 0, FieldCodec::U8),
        field("utc_minutes", 1, FieldCodec::U8),
        field("utc_seconds", 2, FieldCodec::U8),
        field("latitude", 3, FieldCodec::F32),
        field("longitude", 7, FieldCodec::F32),
        field("altitude", 11, FieldCodec::I16),
        field("velocity_north", 13, CENTI_I16),
        field("velocity_east", 15, CENTI_I16),
        field("velocity_down", 17, CENTI_I16),
        field("roll", 19, CENTI_I16),
        field("pitch", 21, CENTI_I16),
        field("yaw", 23, FieldCodec::Scaled(IntCodec::I16, 0.02)),
        field("airspeed", 25, CENTI_I16),
        field("wind_vertical", 27, CENTI_I16),
        field("sideslip", 29, CENTI_I16),
        field("aoa_differential", 31, FieldCodec::Scaled(IntCodec::I16, 0.0001)),
        field(
            "sideslip_differential",
            33,
            FieldCodec::Scaled(IntCodec::I16, 0.0001),
        ),
    ],
};

/// Purge flow packet, id 4.
pub static PURGE: Schema = Schema {
    packet_type: PacketType::Purge,
    body_len: 2,
    fields: &[field("flow", 0, FieldCodec::I16)],
};

/// Probe temperature packet, id 5.
pub static TEMP: Schema = Schema {
    packet_type: PacketType::Temp,
    body_len: 6,
    fields: &[
        field("forward", 0, FieldCodec::I16),
        field("aft", 2, FieldCodec::I16),
        field("threshold", 4, FieldCodec::I16),
    ],
};
