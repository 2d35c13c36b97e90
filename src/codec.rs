//! Big-endian conversions between raw bytes and fixed-width values
//!
//! Every integer in a WOFF file is stored in network byte order. These helpers are strict about
//! widths: a four byte read given three bytes is an error, never a zero-padded value.

use bytes::BufMut as _;

use crate::error::{Result, WoffError, malformed_if};

/// Borrow `length` bytes starting at `offset`, failing if the range runs past the buffer.
pub fn read_fixed_bytes(buffer: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    let end = offset.checked_add(length);
    match end.and_then(|end| buffer.get(offset..end)) {
        Some(bytes) => Ok(bytes),
        None => Err(WoffError::MalformedInput(format!(
            "read of {length} bytes at offset {offset} exceeds buffer of {} bytes",
            buffer.len()
        ))),
    }
}

/// Copy exactly `N` bytes starting at `offset`.
pub fn read_array<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N]> {
    let bytes = read_fixed_bytes(buffer, offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

pub fn bytes_to_u32(bytes: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = exact_width(bytes)?;
    Ok(u32::from_be_bytes(bytes))
}

pub fn u32_to_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn bytes_to_u16(bytes: &[u8]) -> Result<u16> {
    let bytes: [u8; 2] = exact_width(bytes)?;
    Ok(u16::from_be_bytes(bytes))
}

pub fn u16_to_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Decode bytes one char per byte. Tags are ASCII so this is lossless for them.
pub fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Inverse of [`bytes_to_string`]. Fails on chars that do not fit in a single byte.
pub fn string_to_bytes(value: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(value.len());
    for ch in value.chars() {
        let Ok(byte) = u8::try_from(ch) else {
            return Err(WoffError::MalformedInput(format!(
                "'{ch}' in {value:?} does not fit in one byte"
            )));
        };
        out.put_u8(byte);
    }
    Ok(out)
}

/// Number of zero bytes needed to bring `len` up to a multiple of four.
pub fn padding_len(len: usize) -> usize {
    crate::Round4!(len) - len
}

fn exact_width<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    malformed_if!(
        bytes.len() != N,
        "expected {N} bytes for a u{} but got {}",
        N * 8,
        bytes.len()
    );
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}
