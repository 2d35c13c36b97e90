use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use bytes::{BufMut as _, Bytes};
use font_types::Tag;
use log::{debug, trace, warn};

use crate::Round4;
use crate::checksum::{CHECKSUM_ADJUSTMENT_OFFSET, checksum};
use crate::compression::{deflate_table, inflate_metadata, inflate_table};
use crate::error::{Block, Result, WoffError, bail, bail_if, malformed_if, usize_will_overflow};
use crate::options::{BuildOptions, ParseOptions};
use crate::parse::Parse;
use crate::table_tags::{Flavor, HEAD};
use crate::woff::header::{HeaderValue, WoffHeader};
use crate::woff::sfnt::{self, SfntTable};
use crate::woff::table_directory::TableDirectoryEntry;

/// A parsed WOFF 1.0 file whose tables can be read, replaced, and written back out.
///
/// The header and table directory are read eagerly by [`parse`](Self::parse). Table data is only
/// decoded when first asked for and is then kept, so each table is inflated at most once.
/// Replacing a table with [`set_table`](Self::set_table) updates its directory entry on the spot;
/// [`build`](Self::build) lays out every table again and serializes the file.
pub struct WoffDocument {
    data: Bytes,
    options: ParseOptions,
    header: WoffHeader,
    directory: Vec<TableDirectoryEntry>,
    /// Where each table lives in `data`. Unlike `directory`, never touched after parsing.
    sources: Vec<TableDirectoryEntry>,
    /// Decoded tables, filled lazily or by `set_table`.
    tables: Vec<OnceCell<Bytes>>,
    metadata_block: Option<Range<usize>>,
    private_block: Option<Range<usize>>,
}

impl WoffDocument {
    /// Parse a WOFF file using [`ParseOptions::default`].
    pub fn parse(raw: impl Into<Bytes>) -> Result<Self> {
        Self::parse_with(raw, ParseOptions::default())
    }

    pub fn parse_with(raw: impl Into<Bytes>, options: ParseOptions) -> Result<Self> {
        let data: Bytes = raw.into();

        let header = WoffHeader::parse(&mut &data[..])?;
        if header.length as usize != data.len() {
            malformed_if!(
                options.strict_length,
                "header length {} does not match file size {}",
                header.length,
                data.len()
            );
            warn!(
                "WOFF header length {} does not match file size {}",
                header.length,
                data.len()
            );
        }
        if header.reserved != 0 {
            warn!("WOFF header reserved field is {}, expected 0", header.reserved);
        }

        // Table directory
        let num_tables = header.num_tables as usize;
        let directory_start = WoffHeader::SIZE;
        let directory_end = directory_start + num_tables * TableDirectoryEntry::SIZE;
        malformed_if!(
            directory_end > data.len(),
            "table directory of {num_tables} entries ends at {directory_end}, past end of file at {}",
            data.len()
        );

        let mut directory = Vec::with_capacity(num_tables);
        let mut seen_tags = HashSet::with_capacity(num_tables);
        for index in 0..num_tables {
            let entry = TableDirectoryEntry::parse_indexed(&data, directory_start, index)?;
            validate_entry(&entry, directory_end, data.len())?;
            if !seen_tags.insert(entry.tag) {
                warn!("table '{}' appears more than once in the table directory", entry.tag);
            }
            directory.push(entry);
        }

        let metadata_block = if header.has_metadata() {
            Some(block_range(
                "metadata",
                header.meta_offset,
                header.meta_length,
                directory_end,
                data.len(),
            )?)
        } else {
            None
        };
        let private_block = if header.has_private_data() {
            Some(block_range(
                "private data",
                header.priv_offset,
                header.priv_length,
                directory_end,
                data.len(),
            )?)
        } else {
            None
        };

        debug!(
            "parsed WOFF: flavor {:#010x}, {} tables, {} bytes",
            header.flavor,
            num_tables,
            data.len()
        );

        Ok(Self {
            data,
            options,
            header,
            sources: directory.clone(),
            directory,
            tables: (0..num_tables).map(|_| OnceCell::new()).collect(),
            metadata_block,
            private_block,
        })
    }

    pub fn header(&self) -> &WoffHeader {
        &self.header
    }

    /// Read a header field by name. See [`WoffHeader::get`].
    pub fn header_value(&self, field_name: &str) -> Result<HeaderValue> {
        self.header.get(field_name)
    }

    /// Write a header field by name. See [`WoffHeader::set`].
    ///
    /// `length` and `total_sfnt_size` are derived and get overwritten by [`build`](Self::build).
    pub fn set_header_value(&mut self, field_name: &str, value: impl Into<HeaderValue>) -> Result<()> {
        self.header.set(field_name, value)
    }

    pub fn num_tables(&self) -> u16 {
        self.header.num_tables
    }

    pub fn flavor_kind(&self) -> Flavor {
        Flavor::from_u32(self.header.flavor)
    }

    pub fn table_directories(&self) -> impl Iterator<Item = &TableDirectoryEntry> {
        self.directory.iter()
    }

    pub fn table_directory(&self, index: usize) -> Result<&TableDirectoryEntry> {
        self.directory.get(index).ok_or(WoffError::IndexOutOfRange {
            index,
            num_tables: self.header.num_tables,
        })
    }

    /// First entry carrying `tag`, in directory order.
    pub fn table_directory_by_tag(&self, tag: Tag) -> Result<&TableDirectoryEntry> {
        self.directory
            .iter()
            .find(|entry| entry.tag == tag)
            .ok_or(WoffError::TableNotFound(tag))
    }

    /// The uncompressed bytes of table `index`.
    ///
    /// Compressed tables are inflated on first access; later calls return the same buffer.
    pub fn get_table(&self, index: usize) -> Result<Bytes> {
        let cell = self.tables.get(index).ok_or(WoffError::IndexOutOfRange {
            index,
            num_tables: self.header.num_tables,
        })?;
        if let Some(table) = cell.get() {
            return Ok(table.clone());
        }

        let table = self.decode_table(index)?;
        Ok(cell.get_or_init(|| table).clone())
    }

    fn decode_table(&self, index: usize) -> Result<Bytes> {
        let source = &self.sources[index];
        let offset = source.offset as usize;

        if !source.is_compressed() {
            // Bounds were checked at parse time
            return Ok(self.data.slice(offset..offset + source.orig_length as usize));
        }

        let format = self.options.stream_format;
        let start = offset + format.header_skip(index);
        let end = (start + source.comp_length as usize).min(self.data.len());
        malformed_if!(
            start >= end,
            "compressed table '{}' starts at {start}, past end of file",
            source.tag
        );

        let table = inflate_table(
            &self.data[start..end],
            format,
            index,
            source.orig_length as usize,
        )?;
        bail_if!(
            table.len() != source.orig_length as usize,
            WoffError::DecompressionError {
                block: Block::Table(index),
                reason: format!(
                    "'{}' inflated to {} bytes but the directory says {}",
                    source.tag,
                    table.len(),
                    source.orig_length
                ),
            }
        );

        debug!(
            "inflated table {index} '{}': {} -> {} bytes",
            source.tag,
            source.comp_length,
            table.len()
        );
        Ok(Bytes::from(table))
    }

    /// Replace table `index` with `value`.
    ///
    /// The table is stored uncompressed: its directory entry gets `comp_length` and `orig_length`
    /// equal to the unpadded length of `value`, and a freshly computed checksum.
    pub fn set_table(&mut self, index: usize, value: impl Into<Bytes>) -> Result<()> {
        let value: Bytes = value.into();
        let num_tables = self.header.num_tables;
        let entry = self
            .directory
            .get_mut(index)
            .ok_or(WoffError::IndexOutOfRange { index, num_tables })?;
        let length = u32::try_from(value.len()).map_err(|_| {
            WoffError::MalformedInput(format!(
                "table of {} bytes is too large for a WOFF file",
                value.len()
            ))
        })?;

        entry.orig_checksum = checksum(&value, entry.tag == HEAD);
        entry.orig_length = length;
        entry.comp_length = length;
        debug!(
            "replaced table {index} '{}': {length} bytes, checksum {:#010x}",
            entry.tag, entry.orig_checksum
        );

        self.tables[index] = OnceCell::from(value);
        Ok(())
    }

    /// Decode every table, in directory order.
    ///
    /// Stops at the first table that fails to decode. Tables decoded before it stay cached.
    pub fn decode_all(&self) -> Result<()> {
        for index in 0..self.directory.len() {
            self.get_table(index)?;
        }
        Ok(())
    }

    /// Check every table against the checksum in its directory entry.
    pub fn verify_checksums(&self) -> Result<()> {
        for entry in &self.directory {
            let table = self.get_table(entry.index)?;
            let actual = checksum(&table, entry.tag == HEAD);
            if actual != entry.orig_checksum {
                warn!(
                    "checksum mismatch for '{}': {:#010x} != {actual:#010x}",
                    entry.tag, entry.orig_checksum
                );
                bail!(WoffError::ChecksumMismatch {
                    tag: entry.tag,
                    expected: entry.orig_checksum,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// The `checkSumAdjustment` value the `head` table should carry for the font as it stands.
    ///
    /// This is computed for the sfnt a decoder produces by writing table data in the order
    /// [`build`](Self::build) stores it (directory order) with records sorted by tag.
    pub fn checksum_adjustment(&self) -> Result<u32> {
        let mut tables = Vec::with_capacity(self.directory.len());
        for entry in &self.directory {
            let table = self.get_table(entry.index)?;
            tables.push(SfntTable {
                tag: entry.tag,
                checksum: checksum(&table, entry.tag == HEAD),
                length: entry.orig_length,
            });
        }
        let font_checksum = sfnt::font_checksum(self.header.flavor, &tables);
        Ok(sfnt::checksum_adjustment(font_checksum))
    }

    /// Recompute `head.checkSumAdjustment` and write it into the `head` table.
    ///
    /// Returns the value written.
    pub fn update_checksum_adjustment(&mut self) -> Result<u32> {
        let index = self.table_directory_by_tag(HEAD)?.index;
        let head = self.get_table(index)?;
        malformed_if!(
            head.len() < CHECKSUM_ADJUSTMENT_OFFSET + 4,
            "head table is only {} bytes long",
            head.len()
        );

        let adjustment = self.checksum_adjustment()?;
        let mut updated = head.to_vec();
        let mut writer =
            &mut updated[CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4];
        writer.put_u32(adjustment);
        self.set_table(index, updated)?;
        Ok(adjustment)
    }

    /// The extended metadata block, decompressed, if the file has one.
    pub fn metadata(&self) -> Result<Option<Vec<u8>>> {
        let Some(range) = self.metadata_block.clone() else {
            return Ok(None);
        };
        let metadata = inflate_metadata(&self.data[range], self.header.meta_orig_length as usize)?;
        bail_if!(
            metadata.len() != self.header.meta_orig_length as usize,
            WoffError::DecompressionError {
                block: Block::Metadata,
                reason: format!(
                    "inflated to {} bytes but the header says {}",
                    metadata.len(),
                    self.header.meta_orig_length
                ),
            }
        );
        Ok(Some(metadata))
    }

    /// The private data block, if the file has one.
    pub fn private_data(&self) -> Option<Bytes> {
        self.private_block
            .clone()
            .map(|range| self.data.slice(range))
    }

    /// Serialize the document using [`BuildOptions::default`], which stores every table uncompressed.
    pub fn build(&mut self) -> Result<Vec<u8>> {
        self.build_with(&BuildOptions::default())
    }

    /// Lay out every table again and serialize the document.
    ///
    /// Tables are written in directory order. The first starts where the earliest table started in
    /// the parsed file and every later one on the next four byte boundary after its predecessor.
    /// The header's `length` and `total_sfnt_size` and every directory `offset` are recomputed to
    /// match. Metadata and private data blocks are copied after the tables.
    ///
    /// Nothing is modified if any table fails to decode or compress.
    pub fn build_with(&mut self, options: &BuildOptions) -> Result<Vec<u8>> {
        let num_tables = self.directory.len();

        let mut stored: Vec<Bytes> = Vec::with_capacity(num_tables);
        for index in 0..num_tables {
            let table = self.get_table(index)?;
            stored.push(self.stored_form(index, table, options)?);
        }

        // Layout
        let directory_end = WoffHeader::SIZE + num_tables * TableDirectoryEntry::SIZE;
        let tables_start = self
            .sources
            .iter()
            .map(|source| source.offset as usize)
            .min()
            .unwrap_or(directory_end);

        let mut offsets: Vec<usize> = Vec::with_capacity(num_tables);
        let mut position = tables_start;
        for (index, table) in stored.iter().enumerate() {
            // The first table stays where it was parsed from, aligned or not.
            let offset = if index == 0 { position } else { Round4!(position) };
            bail_if!(usize_will_overflow(offset, table.len()), too_large());
            offsets.push(offset);
            position = offset + table.len();
        }
        let tables_end = Round4!(position);

        let metadata_offset = self.metadata_block.as_ref().map(|_| tables_end);
        position = tables_end + self.metadata_block.as_ref().map_or(0, |block| block.len());
        let private_offset = self.private_block.as_ref().map(|_| Round4!(position));
        if let (Some(offset), Some(block)) = (private_offset, &self.private_block) {
            position = offset + block.len();
        }
        let length = position;

        let sfnt_size = sfnt::total_sfnt_size(self.directory.iter().map(|entry| entry.orig_length));

        // Everything must fit the 32 bit fields before anything is committed.
        let length = u32::try_from(length).map_err(|_| too_large())?;
        let total_sfnt_size = u32::try_from(sfnt_size).map_err(|_| too_large())?;
        let offsets: Vec<u32> = offsets
            .into_iter()
            .map(|offset| u32::try_from(offset).map_err(|_| too_large()))
            .collect::<Result<_>>()?;

        // Commit
        for ((entry, offset), table) in self.directory.iter_mut().zip(&offsets).zip(&stored) {
            entry.offset = *offset;
            entry.comp_length = table.len() as u32;
            trace!(
                "table {} '{}' at {offset}: {} of {} bytes",
                entry.index, entry.tag, entry.comp_length, entry.orig_length
            );
        }
        self.header.length = length;
        self.header.total_sfnt_size = total_sfnt_size;
        if let Some(offset) = metadata_offset {
            self.header.meta_offset = offset as u32;
        }
        if let Some(offset) = private_offset {
            self.header.priv_offset = offset as u32;
        }

        // Serialize
        let mut out: Vec<u8> = Vec::with_capacity(length as usize);
        out.put_slice(&self.header.to_bytes());
        for entry in &self.directory {
            out.put_slice(&entry.to_bytes());
        }
        for (offset, table) in offsets.iter().zip(&stored) {
            out.resize(*offset as usize, 0);
            out.put_slice(table);
        }
        out.resize(tables_end, 0);
        if let (Some(offset), Some(block)) = (metadata_offset, &self.metadata_block) {
            out.resize(offset, 0);
            out.put_slice(&self.data[block.clone()]);
        }
        if let (Some(offset), Some(block)) = (private_offset, &self.private_block) {
            out.resize(offset, 0);
            out.put_slice(&self.data[block.clone()]);
        }
        debug_assert_eq!(out.len(), length as usize);

        debug!(
            "built WOFF: {num_tables} tables, {length} bytes, total_sfnt_size {total_sfnt_size}"
        );
        Ok(out)
    }

    /// The bytes to store for a table: deflated when asked for and smaller, the table itself otherwise.
    fn stored_form(&self, index: usize, table: Bytes, options: &BuildOptions) -> Result<Bytes> {
        if !options.compress_tables {
            return Ok(table);
        }
        let compressed = deflate_table(&table, options.stream_format, index)?;
        // Only strictly smaller, so `comp_length != orig_length` keeps marking compressed tables.
        if compressed.len() < table.len() {
            Ok(Bytes::from(compressed))
        } else {
            Ok(table)
        }
    }
}

fn too_large() -> WoffError {
    WoffError::MalformedInput("rebuilt file would exceed 4 GiB".to_string())
}

fn validate_entry(entry: &TableDirectoryEntry, directory_end: usize, file_len: usize) -> Result<()> {
    let tag = entry.tag;
    malformed_if!(
        (entry.offset as usize) < directory_end,
        "table '{tag}' at offset {} overlaps the header or table directory",
        entry.offset
    );
    malformed_if!(
        entry.end() > file_len as u64,
        "table '{tag}' spans {}..{}, past end of file at {file_len}",
        entry.offset,
        entry.end()
    );
    malformed_if!(
        entry.comp_length > entry.orig_length,
        "table '{tag}' is stored in {} bytes, more than its {} uncompressed bytes",
        entry.comp_length,
        entry.orig_length
    );
    Ok(())
}

fn block_range(
    name: &str,
    offset: u32,
    length: u32,
    directory_end: usize,
    file_len: usize,
) -> Result<Range<usize>> {
    let start = offset as usize;
    let end = start + length as usize;
    malformed_if!(
        start < directory_end || end > file_len,
        "{name} block spans {start}..{end}, outside the file's data area (ends at {file_len})"
    );
    Ok(start..end)
}

/// A multi-line report of the header and table directory.
impl fmt::Display for WoffDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(f, "signature:       {}", header.signature)?;
        writeln!(f, "flavor:          {:#010x} ({:?})", header.flavor, self.flavor_kind())?;
        writeln!(f, "length:          {}", header.length)?;
        writeln!(f, "num_tables:      {}", header.num_tables)?;
        writeln!(f, "total_sfnt_size: {}", header.total_sfnt_size)?;
        writeln!(f, "version:         {}.{}", header.major_version, header.minor_version)?;
        writeln!(
            f,
            "metadata:        offset {} length {} (orig {})",
            header.meta_offset, header.meta_length, header.meta_orig_length
        )?;
        writeln!(
            f,
            "private data:    offset {} length {}",
            header.priv_offset, header.priv_length
        )?;
        for entry in &self.directory {
            writeln!(
                f,
                "{:>3} {} offset {:>8} comp {:>8} orig {:>8} checksum {:#010x}",
                entry.index,
                entry.tag,
                entry.offset,
                entry.comp_length,
                entry.orig_length,
                entry.orig_checksum
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for WoffDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WoffDocument")
            .field("header", &self.header)
            .field("directory", &self.directory)
            .field("decoded", &self.tables.iter().filter(|t| t.get().is_some()).count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(offset: u32, comp_length: u32, orig_length: u32) -> TableDirectoryEntry {
        TableDirectoryEntry {
            index: 0,
            tag: Tag::new(b"cmap"),
            offset,
            comp_length,
            orig_length,
            orig_checksum: 0,
        }
    }

    #[test]
    fn entries_must_sit_inside_the_data_area() {
        assert!(validate_entry(&entry(64, 10, 10), 64, 74).is_ok());
        assert!(validate_entry(&entry(60, 10, 10), 64, 100).is_err());
        assert!(validate_entry(&entry(64, 10, 10), 64, 73).is_err());
        assert!(validate_entry(&entry(64, 12, 10), 64, 100).is_err());
        // A u32 end past usize on 32 bit targets still compares correctly.
        assert!(validate_entry(&entry(u32::MAX, 10, 10), 64, 100).is_err());
    }

    #[test]
    fn blocks_must_sit_inside_the_data_area() {
        assert_eq!(block_range("metadata", 100, 20, 64, 120).unwrap(), 100..120);
        assert!(block_range("metadata", 100, 21, 64, 120).is_err());
        assert!(block_range("private data", 40, 4, 64, 120).is_err());
    }
}
