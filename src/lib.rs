#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod buffer;
pub mod decoder;
pub mod error;
pub mod field;
pub mod framer;
pub mod packet;
pub mod schema;

#[cfg(any(feature = "async-codec", feature = "tokio-codec"))]
#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "async-codec", feature = "tokio-codec")))
)]
/// This module provides Sink/Stream support for parsing [Packet]s from
/// an I/O byte stream with frame resynchronisation.
///
/// It provides implementations of both the asynchronous-codec and the
/// tokio-util::codec traits for compatibility.
pub mod codec;

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod recorder;

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod state;

#[cfg(feature = "daemon")]
#[cfg_attr(docsrs, doc(cfg(feature = "daemon")))]
pub mod serial;

#[cfg(feature = "daemon")]
#[cfg_attr(docsrs, doc(cfg(feature = "daemon")))]
pub mod server;

pub use buffer::ByteBuffer;
pub use decoder::{CancellationToken, PacketQueue, StreamDecoder};
pub use error::{AimmsError, FrameError, MisalignedReason, Result};
pub use field::{FieldCodec, FieldValue, IntCodec, StatusFlags};
pub use framer::Framer;
pub use packet::{checksum, Packet, FOOTER_LEN, HEADER_LEN, START_BYTE};
pub use schema::{FieldSpec, PacketType, Schema};
