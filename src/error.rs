use std::fmt;

use font_types::Tag;

/// Errors produced while parsing, decoding or rebuilding a WOFF file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum WoffError {
    /// The first four bytes of the input were not `wOFF`.
    #[error("invalid signature {found}, expected 'wOFF'")]
    InvalidSignature { found: Tag },
    /// The input is too short for a declared extent, or a fixed-width read got the wrong byte count.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// A table index past the end of the table directory.
    #[error("table index {index} out of range (font has {num_tables} tables)")]
    IndexOutOfRange { index: usize, num_tables: u16 },
    /// No table directory entry carries the requested tag.
    #[error("no table with tag '{0}'")]
    TableNotFound(Tag),
    /// A named header accessor was given a name outside the header field set.
    #[error("unknown header field '{0}'")]
    UnknownHeaderField(String),
    /// A compressed block could not be inflated, or inflated to the wrong size.
    #[error("failed to decompress {block}: {reason}")]
    DecompressionError { block: Block, reason: String },
    /// A block could not be deflated.
    #[error("failed to compress {block}: {reason}")]
    CompressionError { block: Block, reason: String },
    /// A recomputed table checksum disagrees with the stored one.
    #[error("checksum mismatch for '{tag}': directory has {expected:#010x}, table sums to {actual:#010x}")]
    ChecksumMismatch { tag: Tag, expected: u32, actual: u32 },
}

/// What a compression error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// A bare stream passed to one of the free functions in [`crate::compression`].
    Stream,
    /// The table at this directory index.
    Table(usize),
    /// The extended metadata block.
    Metadata,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Stream => f.write_str("deflate stream"),
            Block::Table(index) => write!(f, "table {index}"),
            Block::Metadata => f.write_str("metadata block"),
        }
    }
}

impl WoffError {
    /// Re-attribute a compression error to `block`. Other errors pass through.
    pub(crate) fn in_block(self, block: Block) -> Self {
        match self {
            WoffError::DecompressionError { reason, .. } => {
                WoffError::DecompressionError { block, reason }
            }
            WoffError::CompressionError { reason, .. } => WoffError::CompressionError { block, reason },
            other => other,
        }
    }
}

pub type Result<T, E = WoffError> = std::result::Result<T, E>;

impl From<bytes::TryGetError> for WoffError {
    fn from(value: bytes::TryGetError) -> Self {
        Self::MalformedInput(format!(
            "needed {} bytes but only {} remained",
            value.requested, value.available
        ))
    }
}

pub(crate) fn usize_will_overflow(a: usize, b: usize) -> bool {
    a.checked_add(b).is_none()
}

#[cfg(not(feature = "debug"))]
mod regular {
    macro_rules! bail {
        ($err: expr) => {
            return Err($err)
        };
    }
    pub(crate) use bail;

    macro_rules! bail_if {
        ($cond: expr, $err: expr) => {
            if $cond {
                return Err($err);
            }
        };
    }
    pub(crate) use bail_if;

    macro_rules! malformed_if {
        ($cond: expr, $($msg:tt)*) => {
            if $cond {
                return Err($crate::error::WoffError::MalformedInput(format!($($msg)*)));
            }
        };
    }
    pub(crate) use malformed_if;
}
#[cfg(not(feature = "debug"))]
pub(crate) use regular::*;

#[cfg(feature = "debug")]
mod debug {
    macro_rules! bail {
        ($err: expr) => {
            panic!("{}", $err)
        };
    }
    pub(crate) use bail;

    macro_rules! bail_if {
        ($cond: expr, $err: expr) => {
            if $cond {
                panic!("{}: {}", stringify!($cond), $err)
            }
        };
    }
    pub(crate) use bail_if;

    macro_rules! malformed_if {
        ($cond: expr, $($msg:tt)*) => {
            if $cond {
                panic!($($msg)*);
            }
        };
    }
    pub(crate) use malformed_if;
}
#[cfg(feature = "debug")]
pub(crate) use debug::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reads_become_malformed_input() {
        use bytes::Buf as _;
        let mut input: &[u8] = &[0, 1];
        let err: WoffError = input.try_get_u32().unwrap_err().into();
        assert_eq!(
            err,
            WoffError::MalformedInput("needed 4 bytes but only 2 remained".to_string())
        );
    }

    #[test]
    fn messages_name_the_block() {
        let err = WoffError::DecompressionError {
            block: Block::Table(3),
            reason: "corrupt deflate stream".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to decompress table 3: corrupt deflate stream"
        );
        let err = WoffError::DecompressionError {
            block: Block::Stream,
            reason: "truncated".into(),
        };
        assert_eq!(err.to_string(), "failed to decompress deflate stream: truncated");
        assert_eq!(
            err.in_block(Block::Metadata).to_string(),
            "failed to decompress metadata block: truncated"
        );
        let err = WoffError::TableNotFound(Tag::new(b"head"));
        assert_eq!(err.clone().in_block(Block::Metadata), err);
    }
}
