use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut as _};
use font_types::Tag;

use crate::error::{Result, WoffError, bail, bail_if};
use crate::parse::Parse;
use crate::table_tags::WOFF_SIGNATURE;

/// WOFF 1.0 file header
///
/// <https://www.w3.org/TR/WOFF/#WOFFHeader>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WoffHeader {
    /// Always `wOFF`.
    pub signature: Tag,
    /// The "sfnt version" of the input font.
    pub flavor: u32,
    /// Total size of the WOFF file.
    pub length: u32,
    /// Number of entries in directory of font tables.
    pub num_tables: u16,
    /// Reserved; set to 0.
    pub reserved: u16,
    /// Total size needed for the uncompressed font data, including the sfnt header, directory, and font tables (including padding).
    pub total_sfnt_size: u32,
    /// Major version of the WOFF file.
    pub major_version: u16,
    /// Minor version of the WOFF file.
    pub minor_version: u16,
    /// Offset to metadata block, from beginning of WOFF file.
    pub meta_offset: u32,
    /// Length of compressed metadata block.
    pub meta_length: u32,
    /// Uncompressed size of metadata block.
    pub meta_orig_length: u32,
    /// Offset to private data block, from beginning of WOFF file.
    pub priv_offset: u32,
    /// Length of private data block.
    pub priv_length: u32,
}

impl Parse for WoffHeader {
    const SIZE: usize = 44;

    fn parse(input: &mut impl Buf) -> Result<Self> {
        let signature = Tag::from_u32(input.try_get_u32()?);
        bail_if!(
            signature != WOFF_SIGNATURE,
            WoffError::InvalidSignature { found: signature }
        );

        Ok(Self {
            signature,
            flavor: input.try_get_u32()?,
            length: input.try_get_u32()?,
            num_tables: input.try_get_u16()?,
            reserved: input.try_get_u16()?,
            total_sfnt_size: input.try_get_u32()?,
            major_version: input.try_get_u16()?,
            minor_version: input.try_get_u16()?,
            meta_offset: input.try_get_u32()?,
            meta_length: input.try_get_u32()?,
            meta_orig_length: input.try_get_u32()?,
            priv_offset: input.try_get_u32()?,
            priv_length: input.try_get_u32()?,
        })
    }
}

impl WoffHeader {
    /// Serialize in on-disk field order.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let mut writer = &mut out[..];
        writer.put_slice(&self.signature.to_be_bytes());
        writer.put_u32(self.flavor);
        writer.put_u32(self.length);
        writer.put_u16(self.num_tables);
        writer.put_u16(self.reserved);
        writer.put_u32(self.total_sfnt_size);
        writer.put_u16(self.major_version);
        writer.put_u16(self.minor_version);
        writer.put_u32(self.meta_offset);
        writer.put_u32(self.meta_length);
        writer.put_u32(self.meta_orig_length);
        writer.put_u32(self.priv_offset);
        writer.put_u32(self.priv_length);
        out
    }

    /// Read a field by its name, e.g. `"total_sfnt_size"`.
    pub fn get(&self, field_name: &str) -> Result<HeaderValue> {
        let field: HeaderField = field_name.parse()?;
        Ok(self.field(field))
    }

    /// Write a field by its name.
    ///
    /// Numeric fields accept any [`HeaderValue`] that fits their width. `num_tables` is fixed by
    /// the table directory and cannot be set, and the signature can only ever be `wOFF`.
    pub fn set(&mut self, field_name: &str, value: impl Into<HeaderValue>) -> Result<()> {
        let field: HeaderField = field_name.parse()?;
        self.set_field(field, value.into())
    }

    pub fn field(&self, field: HeaderField) -> HeaderValue {
        use HeaderField::*;
        match field {
            Signature => HeaderValue::Tag(self.signature),
            Flavor => HeaderValue::U32(self.flavor),
            Length => HeaderValue::U32(self.length),
            NumTables => HeaderValue::U16(self.num_tables),
            Reserved => HeaderValue::U16(self.reserved),
            TotalSfntSize => HeaderValue::U32(self.total_sfnt_size),
            MajorVersion => HeaderValue::U16(self.major_version),
            MinorVersion => HeaderValue::U16(self.minor_version),
            MetaOffset => HeaderValue::U32(self.meta_offset),
            MetaLength => HeaderValue::U32(self.meta_length),
            MetaOrigLength => HeaderValue::U32(self.meta_orig_length),
            PrivOffset => HeaderValue::U32(self.priv_offset),
            PrivLength => HeaderValue::U32(self.priv_length),
        }
    }

    pub fn set_field(&mut self, field: HeaderField, value: HeaderValue) -> Result<()> {
        use HeaderField::*;
        match field {
            Signature => {
                let found = value.as_tag(field)?;
                bail_if!(found != WOFF_SIGNATURE, WoffError::InvalidSignature { found });
            }
            NumTables => bail!(WoffError::MalformedInput(
                "num_tables is fixed by the table directory".to_string()
            )),
            Flavor => self.flavor = value.as_u32(field)?,
            Length => self.length = value.as_u32(field)?,
            Reserved => self.reserved = value.as_u16(field)?,
            TotalSfntSize => self.total_sfnt_size = value.as_u32(field)?,
            MajorVersion => self.major_version = value.as_u16(field)?,
            MinorVersion => self.minor_version = value.as_u16(field)?,
            MetaOffset => self.meta_offset = value.as_u32(field)?,
            MetaLength => self.meta_length = value.as_u32(field)?,
            MetaOrigLength => self.meta_orig_length = value.as_u32(field)?,
            PrivOffset => self.priv_offset = value.as_u32(field)?,
            PrivLength => self.priv_length = value.as_u32(field)?,
        }
        Ok(())
    }

    pub(crate) fn has_metadata(&self) -> bool {
        self.meta_offset != 0 && self.meta_length != 0
    }

    pub(crate) fn has_private_data(&self) -> bool {
        self.priv_offset != 0 && self.priv_length != 0
    }
}

/// The closed set of header fields, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Signature,
    Flavor,
    Length,
    NumTables,
    Reserved,
    TotalSfntSize,
    MajorVersion,
    MinorVersion,
    MetaOffset,
    MetaLength,
    MetaOrigLength,
    PrivOffset,
    PrivLength,
}

impl HeaderField {
    pub const ALL: [HeaderField; 13] = [
        HeaderField::Signature,
        HeaderField::Flavor,
        HeaderField::Length,
        HeaderField::NumTables,
        HeaderField::Reserved,
        HeaderField::TotalSfntSize,
        HeaderField::MajorVersion,
        HeaderField::MinorVersion,
        HeaderField::MetaOffset,
        HeaderField::MetaLength,
        HeaderField::MetaOrigLength,
        HeaderField::PrivOffset,
        HeaderField::PrivLength,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeaderField::Signature => "signature",
            HeaderField::Flavor => "flavor",
            HeaderField::Length => "length",
            HeaderField::NumTables => "num_tables",
            HeaderField::Reserved => "reserved",
            HeaderField::TotalSfntSize => "total_sfnt_size",
            HeaderField::MajorVersion => "major_version",
            HeaderField::MinorVersion => "minor_version",
            HeaderField::MetaOffset => "meta_offset",
            HeaderField::MetaLength => "meta_length",
            HeaderField::MetaOrigLength => "meta_org_length",
            HeaderField::PrivOffset => "priv_offset",
            HeaderField::PrivLength => "priv_length",
        }
    }
}

impl FromStr for HeaderField {
    type Err = WoffError;

    fn from_str(name: &str) -> Result<Self> {
        HeaderField::ALL
            .into_iter()
            .find(|field| field.name() == name)
            .ok_or_else(|| WoffError::UnknownHeaderField(name.to_string()))
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value of one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderValue {
    Tag(Tag),
    U16(u16),
    U32(u32),
}

impl HeaderValue {
    fn as_u32(self, field: HeaderField) -> Result<u32> {
        match self {
            HeaderValue::U16(value) => Ok(value.into()),
            HeaderValue::U32(value) => Ok(value),
            HeaderValue::Tag(_) => Err(mismatch(field, self)),
        }
    }

    fn as_u16(self, field: HeaderField) -> Result<u16> {
        match self {
            HeaderValue::U16(value) => Ok(value),
            HeaderValue::U32(value) => u16::try_from(value).map_err(|_| mismatch(field, self)),
            HeaderValue::Tag(_) => Err(mismatch(field, self)),
        }
    }

    fn as_tag(self, field: HeaderField) -> Result<Tag> {
        match self {
            HeaderValue::Tag(tag) => Ok(tag),
            _ => Err(mismatch(field, self)),
        }
    }
}

fn mismatch(field: HeaderField, value: HeaderValue) -> WoffError {
    WoffError::MalformedInput(format!("{value} does not fit header field {field}"))
}

impl From<u16> for HeaderValue {
    fn from(value: u16) -> Self {
        HeaderValue::U16(value)
    }
}

impl From<u32> for HeaderValue {
    fn from(value: u32) -> Self {
        HeaderValue::U32(value)
    }
}

impl From<Tag> for HeaderValue {
    fn from(value: Tag) -> Self {
        HeaderValue::Tag(value)
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Tag(tag) => write!(f, "{tag}"),
            HeaderValue::U16(value) => write!(f, "{value}"),
            HeaderValue::U32(value) => write!(f, "{value}"),
        }
    }
}

// Lets tests and callers compare against plain literals.
impl PartialEq<u32> for HeaderValue {
    fn eq(&self, other: &u32) -> bool {
        match *self {
            HeaderValue::U16(value) => u32::from(value) == *other,
            HeaderValue::U32(value) => value == *other,
            HeaderValue::Tag(_) => false,
        }
    }
}

impl PartialEq<&str> for HeaderValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, HeaderValue::Tag(tag) if tag == other)
    }
}
