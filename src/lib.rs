//! Pure Rust WOFF 1.0 reader and writer
//!
//! [`WoffDocument::parse`] reads the header and table directory of a WOFF file. Tables are
//! inflated on demand with [`WoffDocument::get_table`], can be replaced with
//! [`WoffDocument::set_table`], and [`WoffDocument::build`] serializes the result with a fresh,
//! 4-byte aligned layout.
//!
//! ```no_run
//! # fn main() -> woffle::Result<()> {
//! let raw = std::fs::read("font.woff").expect("read font");
//! let mut font = woffle::WoffDocument::parse(raw)?;
//! let name = font.table_directory_by_tag(font_types::Tag::new(b"name"))?.index;
//! let mut table = font.get_table(name)?.to_vec();
//! table.truncate(6);
//! font.set_table(name, table)?;
//! let rebuilt = font.build()?;
//! # let _ = rebuilt;
//! # Ok(())
//! # }
//! ```
//!
//! WOFF2 is not supported.

pub mod checksum;
pub mod codec;
pub mod compression;
mod error;
pub mod options;
mod parse;
pub mod table_tags;
pub mod woff;

pub use error::{Block, Result, WoffError};
pub use options::{BuildOptions, ParseOptions, StreamFormat};
pub use parse::Parse;
pub use table_tags::Flavor;
pub use woff::document::WoffDocument;
pub use woff::header::{HeaderField, HeaderValue, WoffHeader};
pub use woff::table_directory::TableDirectoryEntry;

// Round a value up to the nearest multiple of 4. Don't round the value in the
// case that rounding up overflows.
//
// Implemented as a macro to make it generic over the type without horrible type bounds
macro_rules! Round4 {
    ($value:expr) => {
        match $value.checked_add(3) {
            Some(value_plus_3) => value_plus_3 & !3,
            None => $value,
        }
    };
}
pub(crate) use Round4;
