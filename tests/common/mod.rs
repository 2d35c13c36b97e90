//! Synthesises WOFF files for the integration tests.
#![allow(dead_code)]

use std::io::Write as _;

use bytes::BufMut as _;
use flate2::Compression;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use font_types::Tag;
use woffle::StreamFormat;
use woffle::checksum::checksum;
use woffle::codec::padding_len;
use woffle::table_tags::HEAD;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct FixtureTable {
    pub tag: Tag,
    pub data: Vec<u8>,
    /// Store deflated, if that comes out smaller.
    pub compress: bool,
}

/// A WOFF file laid out the way a conforming encoder would: tables in the given order right after
/// the directory, each on a four byte boundary, followed by the optional metadata and private
/// blocks. `first_offset` moves the first table, which then need not be aligned.
pub struct WoffFixture {
    pub flavor: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub stream_format: StreamFormat,
    pub tables: Vec<FixtureTable>,
    pub metadata: Option<Vec<u8>>,
    pub private_data: Option<Vec<u8>>,
    pub first_offset: Option<usize>,
}

impl WoffFixture {
    pub fn new(flavor: u32) -> Self {
        Self {
            flavor,
            major_version: 1,
            minor_version: 0,
            stream_format: StreamFormat::Zlib,
            tables: Vec::new(),
            metadata: None,
            private_data: None,
            first_offset: None,
        }
    }

    pub fn table(mut self, tag: &[u8; 4], data: Vec<u8>, compress: bool) -> Self {
        self.tables.push(FixtureTable {
            tag: Tag::new(tag),
            data,
            compress,
        });
        self
    }

    pub fn stream_format(mut self, format: StreamFormat) -> Self {
        self.stream_format = format;
        self
    }

    pub fn metadata(mut self, xml: &[u8]) -> Self {
        self.metadata = Some(xml.to_vec());
        self
    }

    pub fn private_data(mut self, data: &[u8]) -> Self {
        self.private_data = Some(data.to_vec());
        self
    }

    pub fn first_offset(mut self, offset: usize) -> Self {
        self.first_offset = Some(offset);
        self
    }

    /// The bytes stored for each table, in table order.
    pub fn stored_tables(&self) -> Vec<Vec<u8>> {
        self.tables
            .iter()
            .enumerate()
            .map(|(index, table)| {
                if !table.compress {
                    return table.data.clone();
                }
                let compressed = compress(&table.data, self.stream_format, index);
                if compressed.len() < table.data.len() {
                    compressed
                } else {
                    table.data.clone()
                }
            })
            .collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let stored = self.stored_tables();
        let num_tables = self.tables.len();

        let mut offsets = Vec::with_capacity(num_tables);
        let mut position = self.first_offset.unwrap_or(44 + 20 * num_tables);
        for (index, table) in stored.iter().enumerate() {
            if index > 0 {
                position += padding_len(position);
            }
            offsets.push(position);
            position += table.len();
        }
        position += padding_len(position);

        let metadata = self.metadata.as_ref().map(|xml| zlib(xml));
        let meta_offset = metadata.as_ref().map(|_| position);
        if let Some(block) = &metadata {
            position += block.len();
        }
        let priv_offset = self
            .private_data
            .as_ref()
            .map(|_| position + padding_len(position));
        if let (Some(offset), Some(block)) = (priv_offset, &self.private_data) {
            position = offset + block.len();
        }
        let length = position;

        let total_sfnt_size: usize = 12
            + 16 * num_tables
            + self
                .tables
                .iter()
                .map(|table| table.data.len() + padding_len(table.data.len()))
                .sum::<usize>();

        let mut out = Vec::with_capacity(length);
        out.put_slice(b"wOFF");
        out.put_u32(self.flavor);
        out.put_u32(length as u32);
        out.put_u16(num_tables as u16);
        out.put_u16(0); // reserved
        out.put_u32(total_sfnt_size as u32);
        out.put_u16(self.major_version);
        out.put_u16(self.minor_version);
        out.put_u32(meta_offset.unwrap_or(0) as u32);
        out.put_u32(metadata.as_ref().map_or(0, |block| block.len()) as u32);
        out.put_u32(self.metadata.as_ref().map_or(0, |xml| xml.len()) as u32);
        out.put_u32(priv_offset.unwrap_or(0) as u32);
        out.put_u32(self.private_data.as_ref().map_or(0, |block| block.len()) as u32);

        for ((table, stored), offset) in self.tables.iter().zip(&stored).zip(&offsets) {
            out.put_slice(&table.tag.to_be_bytes());
            out.put_u32(*offset as u32);
            out.put_u32(stored.len() as u32);
            out.put_u32(table.data.len() as u32);
            out.put_u32(checksum(&table.data, table.tag == HEAD));
        }

        for (stored, offset) in stored.iter().zip(&offsets) {
            out.resize(*offset, 0);
            out.put_slice(stored);
        }
        out.put_bytes(0, padding_len(out.len()));
        if let Some(block) = &metadata {
            out.put_slice(block);
        }
        if let (Some(offset), Some(block)) = (priv_offset, &self.private_data) {
            out.resize(offset, 0);
            out.put_slice(block);
        }
        assert_eq!(out.len(), length);
        out
    }
}

fn compress(data: &[u8], format: StreamFormat, index: usize) -> Vec<u8> {
    match format {
        StreamFormat::Zlib => zlib(data),
        // Non-first tables are read two bytes in, past the zlib header.
        StreamFormat::LegacyHeaderSkip if index > 0 => zlib(data),
        _ => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Deterministic bytes that deflate poorly.
pub fn noise(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Bytes that deflate well.
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 7) as u8)).collect()
}

/// A 54 byte `head` table with a non-zero `checkSumAdjustment`.
pub fn head_table() -> Vec<u8> {
    let mut head = Vec::with_capacity(54);
    head.put_u32(0x0001_0000); // version
    head.put_u32(0x0001_8000); // fontRevision
    head.put_u32(0x1234_5678); // checkSumAdjustment
    head.put_u32(0x5F0F_3CF5); // magicNumber
    head.put_u16(0x000B); // flags
    head.put_u16(2048); // unitsPerEm
    head.put_slice(&noise(54, 16)); // created, modified
    head.put_slice(&[0xFE, 0x00, 0xFD, 0x80, 0x08, 0x00, 0x07, 0x80]); // bbox
    head.put_u16(0); // macStyle
    head.put_u16(9); // lowestRecPPEM
    head.put_u16(2); // fontDirectionHint
    head.put_u16(1); // indexToLocFormat
    head.put_u16(0); // glyphDataFormat
    assert_eq!(head.len(), 54);
    head
}

/// A TrueType-flavored font with 13 tables. The tables up to `hmtx` are stored uncompressed,
/// which puts `kern` at offset 11212; `kern`, `loca`, `maxp` and `post` are compressed.
pub fn thirteen_tables() -> WoffFixture {
    WoffFixture::new(0x0001_0000)
        .table(b"FFTM", noise(1, 28), false)
        .table(b"GDEF", noise(2, 32), false)
        .table(b"OS/2", noise(3, 96), false)
        .table(b"cmap", noise(4, 340), false)
        .table(b"gasp", noise(5, 8), false)
        .table(b"glyf", noise(6, 9912), false)
        .table(b"head", head_table(), false)
        .table(b"hhea", noise(8, 36), false)
        .table(b"hmtx", noise(9, 400), false)
        .table(b"kern", pattern(10, 30000), true)
        .table(b"loca", pattern(11, 5028), true)
        .table(b"maxp", pattern(12, 32), true)
        .table(b"post", pattern(13, 32), true)
}

/// A small font whose tables are all stored uncompressed.
pub fn uncompressed() -> WoffFixture {
    WoffFixture::new(0x4F54_544F)
        .table(b"CFF ", noise(20, 301), false)
        .table(b"head", head_table(), false)
        .table(b"maxp", noise(21, 6), false)
}
