//! Packet assembly and disassembly.
//!
//! A packet is one complete wire unit: header, meta pack, payload. Assembly
//! serializes the meta, enforces the size ceiling, and concatenates the three
//! parts; disassembly validates the header, decodes the meta, and slices the
//! payload plus any trailing bytes (`rest`) so pipelined buffers holding more
//! than one packet can be consumed by re-invoking on `rest`.
//!
//! Payload bytes are taken as-is: compression (if any) is the caller's
//! concern and must already have been applied.

use bytes::{Bytes, BytesMut};

use super::meta::{
    decode_request_meta, decode_response_meta, encode_request_meta, encode_response_meta,
    RequestMeta, ResponseMeta,
};
use super::wire_format::{Header, HEADER_SIZE, MAX_PACKET_SIZE};
use crate::error::{PbrpcError, Result};

/// A disassembled request packet.
#[derive(Debug, Clone)]
pub struct RequestPacket {
    /// Decoded request meta.
    pub meta: RequestMeta,
    /// Raw payload bytes (possibly compressed, zero-copy slice).
    pub payload: Bytes,
    /// Bytes beyond the packet boundary, empty for an exact buffer.
    pub rest: Bytes,
}

/// A disassembled response packet.
#[derive(Debug, Clone)]
pub struct ResponsePacket {
    /// Decoded response meta.
    pub meta: ResponseMeta,
    /// Raw payload bytes (possibly compressed, zero-copy slice).
    pub payload: Bytes,
    /// Bytes beyond the packet boundary, empty for an exact buffer.
    pub rest: Bytes,
}

fn assemble(meta_buf: Vec<u8>, payload: &[u8]) -> Result<Bytes> {
    let body_size = meta_buf.len() + payload.len();
    if body_size > MAX_PACKET_SIZE {
        return Err(PbrpcError::PacketTooLarge {
            size: body_size,
            limit: MAX_PACKET_SIZE,
        });
    }

    let header = Header::new(meta_buf.len() as u32, payload.len() as u32);
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body_size);
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(&meta_buf);
    buf.extend_from_slice(payload);
    Ok(buf.freeze())
}

/// Assemble a complete request packet ready for the transport.
///
/// # Errors
///
/// [`PbrpcError::PacketTooLarge`] if meta + payload exceed
/// [`MAX_PACKET_SIZE`]; nothing is written in that case.
pub fn assemble_request_packet(meta: &RequestMeta, payload: &[u8]) -> Result<Bytes> {
    assemble(encode_request_meta(meta), payload)
}

/// Assemble a complete response packet ready for the transport.
pub fn assemble_response_packet(meta: &ResponseMeta, payload: &[u8]) -> Result<Bytes> {
    assemble(encode_response_meta(meta), payload)
}

fn split_body(buf: &Bytes) -> Result<(Header, Bytes, Bytes, Bytes)> {
    let header = Header::decode(buf)?;

    let meta_end = HEADER_SIZE + header.meta_size as usize;
    if buf.len() < meta_end {
        return Err(PbrpcError::TruncatedMeta {
            declared: meta_end,
            available: buf.len(),
        });
    }

    let total_end = HEADER_SIZE + header.total_size as usize;
    if buf.len() < total_end {
        return Err(PbrpcError::TruncatedPayload {
            declared: total_end,
            available: buf.len(),
        });
    }

    let meta_buf = buf.slice(HEADER_SIZE..meta_end);
    let payload = buf.slice(meta_end..total_end);
    let rest = buf.slice(total_end..);
    Ok((header, meta_buf, payload, rest))
}

/// Disassemble a request packet from the front of `buf`.
///
/// Trailing bytes beyond the declared packet boundary come back in
/// [`RequestPacket::rest`]; call this again on `rest` to drain a pipelined
/// buffer.
pub fn disassemble_request_packet(buf: &Bytes) -> Result<RequestPacket> {
    let (_, meta_buf, payload, rest) = split_body(buf)?;
    Ok(RequestPacket {
        meta: decode_request_meta(&meta_buf)?,
        payload,
        rest,
    })
}

/// Disassemble a response packet from the front of `buf`.
pub fn disassemble_response_packet(buf: &Bytes) -> Result<ResponsePacket> {
    let (_, meta_buf, payload, rest) = split_body(buf)?;
    Ok(ResponsePacket {
        meta: decode_response_meta(&meta_buf)?,
        payload,
        rest,
    })
}
