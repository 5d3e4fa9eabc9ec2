//! Gzip helpers for cache blobs.
//!
//! Grounded on `content_saver::compression::save_compressed_file`: content
//! is gzipped with `flate2`, and large payloads are compressed on the
//! blocking thread pool so the async runtime isn't stalled.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Above this size, compression is offloaded to `spawn_blocking`.
const INLINE_COMPRESSION_THRESHOLD: usize = 256 * 1024;

fn compress_sync(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(3));
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn decompress_sync(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Gzip-compress `bytes`, moving the work to a blocking thread for large
/// payloads (full driver rosters can run into the hundreds of KB).
pub async fn compress(bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
    if bytes.len() < INLINE_COMPRESSION_THRESHOLD {
        return compress_sync(&bytes);
    }
    tokio::task::spawn_blocking(move || compress_sync(&bytes))
        .await
        .map_err(|e| std::io::Error::other(format!("compression task panicked: {e}")))?
}

/// Gzip-decompress `bytes`.
pub async fn decompress(bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
    if bytes.len() < INLINE_COMPRESSION_THRESHOLD {
        return decompress_sync(&bytes);
    }
    tokio::task::spawn_blocking(move || decompress_sync(&bytes))
        .await
        .map_err(|e| std::io::Error::other(format!("decompression task panicked: {e}")))?
}
