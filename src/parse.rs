use bytes::Buf;

use crate::codec::read_fixed_bytes;
use crate::error::Result;

/// A fixed-size record read field by field from a big-endian buffer.
pub trait Parse: Sized {
    /// Size of the record on disk, in bytes.
    const SIZE: usize;

    fn parse(input: &mut impl Buf) -> Result<Self>;

    /// Parse the record found at `offset`, returning it with the number of bytes consumed.
    fn parse_at(buffer: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut input = read_fixed_bytes(buffer, offset, Self::SIZE)?;
        Ok((Self::parse(&mut input)?, Self::SIZE))
    }
}
