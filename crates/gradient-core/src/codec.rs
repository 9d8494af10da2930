//! Wire format
//!
//! ```text
//! [version:1][kind:1][body]
//! ```
//!
//! - **version**: [`WIRE_VERSION`]
//! - **kind**: [`PacketKind`] tag, so BUILD and DATA can be told apart
//!   before the body is decoded
//! - **body**: postcard encoding of [`BuildPacket`] or [`DataPacket`]
//!
//! Frames carry no destination; every frame is a local broadcast.

use crate::error::CodecError;
use crate::packet::{BuildPacket, DataPacket, Packet, PacketKind};

/// Current wire format version
pub const WIRE_VERSION: u8 = 1;

/// Bytes preceding the body: version + kind
const PREAMBLE_LEN: usize = 2;

/// Encode a packet into a frame
pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let mut frame = vec![WIRE_VERSION, packet.kind() as u8];
    let body = match packet {
        Packet::Build(p) => postcard::to_allocvec(p)?,
        Packet::Data(p) => postcard::to_allocvec(p)?,
    };
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a frame into a packet
pub fn decode(frame: &[u8]) -> Result<Packet, CodecError> {
    if frame.len() < PREAMBLE_LEN {
        return Err(CodecError::Truncated { len: frame.len() });
    }
    if frame[0] != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(frame[0]));
    }
    let kind = PacketKind::try_from(frame[1]).map_err(CodecError::UnknownPacketKind)?;
    let body = &frame[PREAMBLE_LEN..];

    let packet = match kind {
        PacketKind::Build => Packet::Build(postcard::from_bytes::<BuildPacket>(body)?),
        PacketKind::Data => Packet::Data(postcard::from_bytes::<DataPacket>(body)?),
    };
    Ok(packet)
}

/// Peek at the kind of a frame without decoding the body
pub fn peek_kind(frame: &[u8]) -> Result<PacketKind, CodecError> {
    match frame {
        [WIRE_VERSION, kind, ..] => {
            PacketKind::try_from(*kind).map_err(CodecError::UnknownPacketKind)
        }
        [version, _, ..] => Err(CodecError::UnsupportedVersion(*version)),
        _ => Err(CodecError::Truncated { len: frame.len() }),
    }
}

/// Size of an outgoing frame including the link header
pub fn frame_len(packet: &Packet, header_overhead: usize) -> Result<usize, CodecError> {
    Ok(encode(packet)?.len() + header_overhead)
}
