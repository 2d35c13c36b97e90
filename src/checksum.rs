//! OpenType table checksums
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/otff#calculating-checksums>

/// Byte offset of `checkSumAdjustment` within the `head` table.
pub const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// The whole-font checksum target that `checkSumAdjustment` is solved against.
pub const CHECKSUM_MAGIC: u32 = 0xB1B0AFBA;

/// Sum a table as big-endian u32 words, wrapping modulo 2^32.
///
/// When `is_head_table` is set, the word holding `checkSumAdjustment` contributes zero, which is
/// how the checksum stored in the table directory for `head` is defined.
pub fn checksum(table: &[u8], is_head_table: bool) -> u32 {
    let sum = compute_checksum(table);
    if is_head_table {
        sum.wrapping_sub(checksum_adjustment(table))
    } else {
        sum
    }
}

/// Plain wrapping sum of big-endian words, with no `head` special case.
pub fn compute_checksum(buf: &[u8]) -> u32 {
    let mut checksum: u32 = 0;
    let mut iter = buf.chunks_exact(4);
    for chunk in &mut iter {
        checksum = checksum.wrapping_add(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    // Treat size not aligned on 4 as if it were padded to 4 with 0's.
    let remainder = iter.remainder();
    if !remainder.is_empty() {
        let mut last = [0u8; 4];
        last[..remainder.len()].copy_from_slice(remainder);
        checksum = checksum.wrapping_add(u32::from_be_bytes(last));
    }

    checksum
}

/// Read the `checkSumAdjustment` word of a `head` table, as zero-padded as the checksum sees it.
pub(crate) fn checksum_adjustment(head: &[u8]) -> u32 {
    let start = CHECKSUM_ADJUSTMENT_OFFSET.min(head.len());
    let end = (CHECKSUM_ADJUSTMENT_OFFSET + 4).min(head.len());
    let mut word = [0u8; 4];
    word[..end - start].copy_from_slice(&head[start..end]);
    u32::from_be_bytes(word)
}
