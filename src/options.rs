//! Knobs for parsing and rebuilding

/// How the bytes of a compressed table are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFormat {
    /// zlib stream starting at the table offset, as written by zlib's `compress2`.
    ///
    /// This is what the WOFF 1.0 specification requires.
    #[default]
    Zlib,
    /// Bare raw-deflate stream starting at the table offset.
    Raw,
    /// Raw-deflate stream that starts two bytes after the offset for every table except the first.
    ///
    /// Some older encoders and decoders treated the zlib header this way. Reading with this format
    /// is only correct for files that actually have that layout; it is never used unless asked for.
    LegacyHeaderSkip,
}

impl StreamFormat {
    /// Bytes to skip at the start of table `index` before inflating.
    pub(crate) fn header_skip(self, index: usize) -> usize {
        match self {
            StreamFormat::LegacyHeaderSkip if index > 0 => 2,
            _ => 0,
        }
    }
}

/// Options for [`WoffDocument::parse_with`](crate::WoffDocument::parse_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Layout of compressed tables.
    pub stream_format: StreamFormat,
    /// Reject files whose header `length` differs from the buffer length.
    ///
    /// When unset a mismatch is only logged.
    pub strict_length: bool,
}

/// Options for [`WoffDocument::build_with`](crate::WoffDocument::build_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Store each table compressed whenever that is smaller than storing it as is.
    pub compress_tables: bool,
    /// Layout to write compressed tables in. Only consulted when `compress_tables` is set.
    pub stream_format: StreamFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_legacy_format_skips() {
        assert_eq!(StreamFormat::Zlib.header_skip(3), 0);
        assert_eq!(StreamFormat::Raw.header_skip(3), 0);
        assert_eq!(StreamFormat::LegacyHeaderSkip.header_skip(0), 0);
        assert_eq!(StreamFormat::LegacyHeaderSkip.header_skip(1), 2);
    }

    #[test]
    fn defaults_read_and_write_zlib_uncompressed() {
        let parse = ParseOptions::default();
        assert_eq!(parse.stream_format, StreamFormat::Zlib);
        assert!(!parse.strict_length);
        assert!(!BuildOptions::default().compress_tables);
    }
}
