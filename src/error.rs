use std::fmt::Display;
use std::io::Error as IoError;
use thiserror::Error;

/// An Aimms Result, conveniently wrapping the [AimmsError]
pub type Result<T> = std::result::Result<T, AimmsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The header invariant a candidate frame violated.
///
/// Any of these marks the byte at offset 0 as a non-start byte; the stream
/// is re-searched from the next offset.
pub enum MisalignedReason {
    /// The first byte was not the start-of-header value `0x01`.
    BadStart(u8),
    /// `id_complement` was not `255 - id`.
    BadComplement {
        /// Packet id read from the header.
        id: u8,
        /// Complement byte read from the header.
        complement: u8,
    },
    /// The packet id does not name a known schema.
    UnknownId(u8),
    /// `body_length` differs from the schema-declared body length for this id.
    BadBodyLength {
        /// Packet id read from the header.
        id: u8,
        /// `body_length` read from the header.
        declared: u8,
        /// Body length the schema declares.
        expected: u8,
    },
}

impl Display for MisalignedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadStart(b) => write!(f, "bad start byte {b:#04X}"),
            Self::BadComplement { id, complement } => write!(
                f,
                "id {id:#04X} and complement {complement:#04X} do not match"
            ),
            Self::UnknownId(id) => write!(f, "unknown packet id {id:#04X}"),
            Self::BadBodyLength {
                id,
                declared,
                expected,
            } => write!(
                f,
                "body length {declared} does not match schema length {expected} for id {id:#04X}"
            ),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Recoverable framing failures at the front of the byte stream.
///
/// Neither variant consumes input. The caller drops exactly one byte and
/// retries, so every offset is visited as a potential frame start.
pub enum FrameError {
    /// Header self-consistency violated; the stream is misaligned here.
    #[error("misaligned frame: {0}")]
    Misaligned(MisalignedReason),
    /// Packet checksums do not match.
    #[error("packet checksums do not match. Expected {expected:#06X} != Computed {computed:#06X}.")]
    ChecksumMismatch {
        /// Checksum carried in the frame footer.
        expected: u16,
        /// Additive sum computed over the received bytes.
        computed: u16,
    },
}

#[derive(Error, Debug)]
/// Error types which can occur while buffering, framing, or encoding packets.
pub enum AimmsError {
    /// I/O error during packet handling.
    #[error("I/O error during packet handling")]
    Io(#[from] IoError),
    /// A recoverable framing failure, surfaced past the resync loop.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// A buffer slice or drop reached past the buffered bytes.
    #[error("byte range {start}..{end} out of bounds for buffer of length {len}")]
    OutOfBounds {
        /// Start of the requested range.
        start: usize,
        /// End of the requested range (exclusive).
        end: usize,
        /// Buffered byte count at the time of the request.
        len: usize,
    },
    /// A packet was encoded without a value for a schema-declared field.
    #[error("no value for field {field:?} of a {tag} packet")]
    MissingField {
        /// Name of the schema field.
        field: &'static str,
        /// Tag of the packet type being encoded.
        tag: &'static str,
    },
    /// A field value cannot be encoded by the schema codec for its slot.
    #[error("cannot encode a {got} value as {expected}")]
    FieldType {
        /// Name of the codec in the schema slot.
        expected: &'static str,
        /// Kind of the value supplied.
        got: &'static str,
    },
    /// The serial link failed or could not be opened.
    #[cfg(feature = "daemon")]
    #[cfg_attr(docsrs, doc(cfg(feature = "daemon")))]
    #[error("serial link error")]
    Serial(#[from] tokio_serial::Error),
}
