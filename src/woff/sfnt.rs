//! The sfnt font a WOFF file decodes to
//!
//! Only what is needed to derive values the WOFF header and the `head` table carry about the
//! decoded font: its total size and its whole-font checksum.

use bytes::BufMut;
use font_types::Tag;

use crate::Round4;
use crate::checksum::{CHECKSUM_MAGIC, compute_checksum};

pub const SFNT_HEADER_SIZE: usize = 12;
pub const SFNT_ENTRY_SIZE: usize = 16;

/// What the sfnt layout needs to know about one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfntTable {
    pub tag: Tag,
    /// Checksum as stored in the sfnt table directory (for `head`, with `checkSumAdjustment` excluded).
    pub checksum: u32,
    pub length: u32,
}

/// Size of the decoded sfnt: header, table records, and every table padded to four bytes.
pub fn total_sfnt_size(table_lengths: impl IntoIterator<Item = u32>) -> u64 {
    let mut num_tables: u64 = 0;
    let mut size: u64 = 0;
    for length in table_lengths {
        num_tables += 1;
        size += Round4!(u64::from(length));
    }
    SFNT_HEADER_SIZE as u64 + SFNT_ENTRY_SIZE as u64 * num_tables + size
}

/// Checksum of the whole decoded sfnt, with `checkSumAdjustment` taken as zero.
///
/// `tables` must be in the order their data is laid out. Table records are written in tag order,
/// each table starting on a four byte boundary right after the previous one.
pub fn font_checksum(flavor: u32, tables: &[SfntTable]) -> u32 {
    let mut directory: Vec<u8> =
        Vec::with_capacity(SFNT_HEADER_SIZE + SFNT_ENTRY_SIZE * tables.len());
    write_table_directory_header(&mut directory, flavor, tables.len() as u16);

    let mut offset = (SFNT_HEADER_SIZE + SFNT_ENTRY_SIZE * tables.len()) as u32;
    let mut records: Vec<(Tag, u32, u32, u32)> = Vec::with_capacity(tables.len());
    for table in tables {
        records.push((table.tag, table.checksum, offset, table.length));
        offset = Round4!(offset.wrapping_add(table.length));
    }
    records.sort_by_key(|record| record.0);
    for (tag, checksum, offset, length) in records {
        directory.put_slice(&tag.to_be_bytes());
        directory.put_u32(checksum);
        directory.put_u32(offset);
        directory.put_u32(length);
    }

    tables
        .iter()
        .fold(compute_checksum(&directory), |sum, table| {
            sum.wrapping_add(table.checksum)
        })
}

/// The value `head.checkSumAdjustment` must hold for a font with this checksum.
pub fn checksum_adjustment(font_checksum: u32) -> u32 {
    CHECKSUM_MAGIC.wrapping_sub(font_checksum)
}

/// Writes an OpenType table directory header
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otff#table-directory>
pub fn write_table_directory_header(output: &mut impl BufMut, flavor: u32, num_tables: u16) {
    let mut max_pow2: u16 = 0;
    while 1u32 << (max_pow2 + 1) <= (num_tables as u32) {
        max_pow2 += 1;
    }
    let entry_selector = max_pow2;
    let search_range: u16 = (1u16 << max_pow2) << 4;
    let range_shift = ((num_tables as u32) << 4).saturating_sub(search_range as u32) as u16;

    output.put_u32(flavor); // sfnt version
    output.put_u16(num_tables); // num_tables
    output.put_u16(search_range); // searchRange
    output.put_u16(entry_selector); // entrySelector
    output.put_u16(range_shift); // rangeShift
}
