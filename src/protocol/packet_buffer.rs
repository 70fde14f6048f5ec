//! Packet buffer for accumulating partial reads.
//!
//! Transports hand over whatever the socket produced; this buffer stitches
//! those fragments back into complete packets. Uses `bytes::BytesMut` for
//! zero-copy buffer management and a two-state machine:
//! - `WaitingForHeader`: need the 12 header bytes
//! - `WaitingForBody`: header parsed, need `total_size` more bytes
//!
//! Each yielded `Bytes` chunk is exactly one packet and can be fed straight to
//! [`disassemble_request_packet`](super::disassemble_request_packet) or its
//! response counterpart.

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, HEADER_SIZE, MAX_PACKET_SIZE};
use crate::error::{PbrpcError, Result};

/// Parsing state.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header.
    WaitingForHeader,
    /// Header parsed, waiting for `total_size` body bytes.
    WaitingForBody { header: Header },
}

/// Accumulates incoming bytes and extracts complete packets.
pub struct PacketBuffer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
}

impl PacketBuffer {
    /// Create an empty packet buffer (64 KiB initial capacity).
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
        }
    }

    /// Push data into the buffer and extract all complete packets.
    ///
    /// Partial data stays buffered for the next push. Each returned chunk is
    /// one full packet including its header.
    ///
    /// # Errors
    ///
    /// Header validation errors ([`PbrpcError::ProtocolMismatch`],
    /// [`PbrpcError::MalformedFrame`]) and [`PbrpcError::PacketTooLarge`]
    /// when a header declares a body beyond [`MAX_PACKET_SIZE`]. The stream
    /// is unrecoverable after such an error; callers should drop the
    /// connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut packets = Vec::new();
        while let Some(packet) = self.try_extract_one()? {
            packets.push(packet);
        }
        Ok(packets)
    }

    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match &self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < HEADER_SIZE {
                    return Ok(None);
                }

                let header = Header::decode(&self.buffer)?;

                if header.total_size as usize > MAX_PACKET_SIZE {
                    return Err(PbrpcError::PacketTooLarge {
                        size: header.total_size as usize,
                        limit: MAX_PACKET_SIZE,
                    });
                }

                // Header bytes stay in the buffer; the packet is split off
                // whole once the body has arrived.
                self.state = State::WaitingForBody { header };
                self.try_extract_one()
            }

            State::WaitingForBody { header } => {
                let packet_len = HEADER_SIZE + header.total_size as usize;
                if self.buffer.len() < packet_len {
                    return Ok(None);
                }

                let packet = self.buffer.split_to(packet_len).freeze();
                self.state = State::WaitingForHeader;
                Ok(Some(packet))
            }
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}
