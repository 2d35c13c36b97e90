use bytes::{Buf, BufMut as _};
use font_types::Tag;

use crate::codec::bytes_to_string;
use crate::error::Result;
use crate::parse::Parse;

/// One entry of the WOFF table directory
///
/// <https://www.w3.org/TR/WOFF/#TableDirectory>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDirectoryEntry {
    /// Position in the directory. Assigned at parse time and never changed.
    pub index: usize,
    /// 4-byte sfnt table identifier.
    pub tag: Tag,
    /// Offset to the data, from beginning of WOFF file.
    pub offset: u32,
    /// Length of the compressed data, excluding padding.
    pub comp_length: u32,
    /// Length of the uncompressed table, excluding padding.
    pub orig_length: u32,
    /// Checksum of the uncompressed table.
    pub orig_checksum: u32,
}

impl Parse for TableDirectoryEntry {
    const SIZE: usize = 20;

    fn parse(input: &mut impl Buf) -> Result<Self> {
        Ok(Self {
            // Set by the caller, which knows the entry's position
            index: 0,
            tag: Tag::from_u32(input.try_get_u32()?),
            offset: input.try_get_u32()?,
            comp_length: input.try_get_u32()?,
            orig_length: input.try_get_u32()?,
            orig_checksum: input.try_get_u32()?,
        })
    }
}

impl TableDirectoryEntry {
    /// Parse the `index`th entry of a directory whose first entry starts at `directory_start`.
    pub(crate) fn parse_indexed(buffer: &[u8], directory_start: usize, index: usize) -> Result<Self> {
        let (mut entry, _) = Self::parse_at(buffer, directory_start + index * Self::SIZE)?;
        entry.index = index;
        Ok(entry)
    }

    /// Serialize in on-disk field order. `index` is not part of the on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let mut writer = &mut out[..];
        writer.put_slice(&self.tag.to_be_bytes());
        writer.put_u32(self.offset);
        writer.put_u32(self.comp_length);
        writer.put_u32(self.orig_length);
        writer.put_u32(self.orig_checksum);
        out
    }

    pub fn tag_string(&self) -> String {
        bytes_to_string(&self.tag.to_be_bytes())
    }

    /// Whether the stored bytes are a compressed stream rather than the table itself.
    pub fn is_compressed(&self) -> bool {
        self.comp_length != self.orig_length
    }

    /// Offset one past the last stored byte, unpadded.
    pub(crate) fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.comp_length)
    }
}
