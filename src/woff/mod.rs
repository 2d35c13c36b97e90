//! The WOFF 1.0 container

pub mod document;
pub mod header;
pub mod sfnt;
pub mod table_directory;
