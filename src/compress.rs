//! Gzip compression pipeline for packet payloads.
//!
//! Gzip is the only supported scheme (wire `compress_type` 2). Compression
//! runs on the blocking pool so large payloads never stall the async
//! scheduler; for a single packet the decompress step always completes before
//! the dependent parse runs, because the two are sequential awaits in one
//! call chain.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{PbrpcError, Result};
use crate::protocol::{CompressType, MAX_PACKET_SIZE};

fn join_err(e: tokio::task::JoinError) -> PbrpcError {
    PbrpcError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Gzip-compress a payload.
pub async fn gzip(data: Bytes) -> Result<Bytes> {
    tokio::task::spawn_blocking(move || {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data)?;
        let compressed = encoder.finish()?;
        Ok(Bytes::from(compressed))
    })
    .await
    .map_err(join_err)?
}

/// Reverse gzip compression.
///
/// Output is capped at [`MAX_PACKET_SIZE`]; a stream inflating past the cap
/// fails with [`PbrpcError::PacketTooLarge`] instead of exhausting memory.
pub async fn gunzip(data: Bytes) -> Result<Bytes> {
    tokio::task::spawn_blocking(move || {
        let decoder = GzDecoder::new(data.as_ref());
        let mut out = Vec::new();
        decoder
            .take(MAX_PACKET_SIZE as u64 + 1)
            .read_to_end(&mut out)?;
        if out.len() > MAX_PACKET_SIZE {
            return Err(PbrpcError::PacketTooLarge {
                size: out.len(),
                limit: MAX_PACKET_SIZE,
            });
        }
        Ok(Bytes::from(out))
    })
    .await
    .map_err(join_err)?
}

/// Undo payload compression according to the meta's compress type.
///
/// `None` passes the bytes through untouched; `Gzip` decompresses. Invalid
/// wire values never reach this function, [`CompressType::from_wire`] rejects
/// them first.
pub async fn decode_payload(compress: CompressType, payload: Bytes) -> Result<Bytes> {
    match compress {
        CompressType::None => Ok(payload),
        CompressType::Gzip => gunzip(payload).await,
    }
}
