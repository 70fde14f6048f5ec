//! Frame header encoding and decoding.
//!
//! Implements the fixed 12-byte header format:
//! ```text
//! ┌──────────┬────────────┬───────────┐
//! │ Magic    │ Total Size │ Meta Size │
//! │ 4 bytes  │ 4 bytes    │ 4 bytes   │
//! │ "HULU"   │ uint32 LE  │ uint32 LE │
//! └──────────┴────────────┴───────────┘
//! ```
//!
//! `total_size` is the combined length of the meta pack and the payload; the
//! header itself is never counted. All multi-byte integers are Little Endian.

use crate::error::{PbrpcError, Result};

/// Header size in bytes (fixed, exactly 12).
pub const HEADER_SIZE: usize = 12;

/// Protocol magic tag, first four bytes of every packet.
pub const MAGIC: [u8; 4] = *b"HULU";

/// Hard ceiling on `meta_size + payload_size` (100 MiB).
///
/// Chunked transfer is not supported; a packet beyond this limit is a hard
/// failure at assembly time.
pub const MAX_PACKET_SIZE: usize = 100 * 1024 * 1024;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Combined meta + payload length in bytes.
    pub total_size: u32,
    /// Meta pack length in bytes.
    pub meta_size: u32,
}

impl Header {
    /// Create a header from the two body lengths.
    pub fn new(meta_size: u32, payload_size: u32) -> Self {
        Self {
            total_size: meta_size + payload_size,
            meta_size,
        }
    }

    /// Payload length implied by the two size fields.
    #[inline]
    pub fn payload_size(&self) -> u32 {
        self.total_size - self.meta_size
    }

    /// Encode the header to bytes. Pure, always 12 bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (12 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.total_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.meta_size.to_le_bytes());
    }

    /// Decode and validate a header from the front of a packet buffer.
    ///
    /// Only the header itself is validated here; whether the buffer holds the
    /// declared body is the disassembler's concern. A meta pack of an
    /// all-default message encodes to zero bytes, so `total_size == 0` and a
    /// bare 12-byte packet are both legal.
    ///
    /// # Errors
    ///
    /// - [`PbrpcError::MalformedFrame`] if `buf.len() < 12` or the declared
    ///   sizes are inconsistent (`total_size < meta_size`)
    /// - [`PbrpcError::ProtocolMismatch`] if the magic tag differs
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(PbrpcError::MalformedFrame(format!(
                "buffer length {} shorter than header size {}",
                buf.len(),
                HEADER_SIZE
            )));
        }
        if buf[0..4] != MAGIC {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(&buf[0..4]);
            return Err(PbrpcError::ProtocolMismatch(magic));
        }
        let total_size = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let meta_size = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        if total_size < meta_size {
            return Err(PbrpcError::MalformedFrame(format!(
                "total_size {} smaller than meta_size {}",
                total_size, meta_size
            )));
        }
        Ok(Self {
            total_size,
            meta_size,
        })
    }
}

/// Build a header for the given body lengths (standalone function).
#[inline]
pub fn make_header(meta_size: u32, payload_size: u32) -> [u8; HEADER_SIZE] {
    Header::new(meta_size, payload_size).encode()
}

/// Parse a header from the front of a packet buffer (standalone function).
#[inline]
pub fn parse_header(buf: &[u8]) -> Result<Header> {
    Header::decode(buf)
}
