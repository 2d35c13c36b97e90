//! DEFLATE plumbing for compressed WOFF blocks, backed by `flate2`
//!
//! WOFF 1.0 tables and the extended metadata block are compressed with zlib's `compress2`, so on
//! disk they are zlib streams (2 byte header, raw deflate data, Adler-32 trailer). [`inflate`] and
//! [`deflate`] deal in bare raw-deflate data; the `zlib_` variants add and check the wrapper.

use std::io::Write as _;

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::error::{Block, Result, WoffError};
use crate::options::StreamFormat;

// Don't trust a declared size blindly when preallocating.
const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// Inflate a raw-deflate stream (no zlib or gzip wrapper).
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    decompress(compressed, false, None).map_err(|reason| decompression_error(Block::Stream, reason))
}

/// Deflate into a raw-deflate stream (no zlib or gzip wrapper).
pub fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::best());
    encoder
        .write_all(raw)
        .and_then(|_| encoder.finish())
        .map_err(|err| WoffError::CompressionError {
            block: Block::Stream,
            reason: err.to_string(),
        })
}

/// Inflate a zlib-wrapped stream.
pub fn zlib_inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    decompress(compressed, true, None).map_err(|reason| decompression_error(Block::Stream, reason))
}

/// Deflate into a zlib-wrapped stream, the form WOFF 1.0 stores compressed blocks in.
pub fn zlib_deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::best());
    encoder
        .write_all(raw)
        .and_then(|_| encoder.finish())
        .map_err(|err| WoffError::CompressionError {
            block: Block::Stream,
            reason: err.to_string(),
        })
}

/// Inflate one compressed table according to `format`, failing once it exceeds `orig_length`.
///
/// `data` must already be positioned at the start of what `format` expects: the zlib header for
/// [`StreamFormat::Zlib`], the first deflate block otherwise.
pub(crate) fn inflate_table(
    data: &[u8],
    format: StreamFormat,
    index: usize,
    orig_length: usize,
) -> Result<Vec<u8>> {
    let zlib_header = matches!(format, StreamFormat::Zlib);
    decompress(data, zlib_header, Some(orig_length))
        .map_err(|reason| decompression_error(Block::Table(index), reason))
}

/// Inflate the extended metadata block, failing once it exceeds `orig_length`.
pub(crate) fn inflate_metadata(data: &[u8], orig_length: usize) -> Result<Vec<u8>> {
    decompress(data, true, Some(orig_length))
        .map_err(|reason| decompression_error(Block::Metadata, reason))
}

/// Deflate one table for storage according to `format`.
pub(crate) fn deflate_table(data: &[u8], format: StreamFormat, index: usize) -> Result<Vec<u8>> {
    // A zlib header is exactly the two bytes the legacy layout skips.
    let compressed = match format {
        StreamFormat::Zlib => zlib_deflate(data),
        StreamFormat::LegacyHeaderSkip if index > 0 => zlib_deflate(data),
        StreamFormat::Raw | StreamFormat::LegacyHeaderSkip => deflate(data),
    };
    compressed.map_err(|err| err.in_block(Block::Table(index)))
}

fn decompression_error(block: Block, reason: String) -> WoffError {
    WoffError::DecompressionError { block, reason }
}

/// Inflate `compressed_data`, growing the output as needed.
///
/// With a `limit`, output never grows much past `limit + 1` bytes and a stream that produces more
/// than `limit` bytes is an error.
fn decompress(
    compressed_data: &[u8],
    zlib_header: bool,
    limit: Option<usize>,
) -> std::result::Result<Vec<u8>, String> {
    let size_hint = limit.unwrap_or(compressed_data.len().saturating_mul(4));
    let mut output: Vec<u8> = Vec::with_capacity(size_hint.clamp(64, MAX_PREALLOCATION));
    let mut decompressor = Decompress::new(zlib_header);
    loop {
        if output.len() == output.capacity() {
            let mut additional = output.capacity().max(1024);
            if let Some(limit) = limit {
                // One byte past the limit is enough to tell an overlong stream apart.
                additional = additional.min((limit + 1).saturating_sub(output.len()).max(1));
            }
            output.reserve_exact(additional);
        }

        let consumed = decompressor.total_in() as usize;
        let produced = decompressor.total_out();
        let status = decompressor
            .decompress_vec(
                &compressed_data[consumed..],
                &mut output,
                FlushDecompress::None,
            )
            .map_err(|err| err.to_string())?;

        if let Some(limit) = limit {
            if output.len() > limit {
                return Err(format!("inflates past the declared {limit} bytes"));
            }
        }
        match status {
            Status::StreamEnd => return Ok(output),
            // No input taken and no output made with room to spare: the input ran out.
            _ if decompressor.total_in() as usize == consumed
                && decompressor.total_out() == produced
                && output.len() < output.capacity() =>
            {
                return Err("unexpected end of deflate stream".to_string());
            }
            _ => {}
        }
    }
}
