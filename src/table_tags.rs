//! Tags and magic numbers

use font_types::Tag;

/// Signature at the start of every WOFF 1.0 file.
pub const WOFF_SIGNATURE: Tag = Tag::new(b"wOFF");

pub const HEAD: Tag = Tag::new(b"head");

// sfnt versions a WOFF flavor may carry.
pub const TRUETYPE_FLAVOR: u32 = 0x00010000;
pub const APPLE_TRUETYPE_FLAVOR: Tag = Tag::new(b"true");
pub const CFF_FLAVOR: Tag = Tag::new(b"OTTO");

/// The kind of glyph data a WOFF file wraps, derived from its flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    TrueType,
    Cff,
    Unknown(u32),
}

impl Flavor {
    pub fn from_u32(flavor: u32) -> Self {
        let tag = Tag::from_u32(flavor);
        if flavor == TRUETYPE_FLAVOR || tag == APPLE_TRUETYPE_FLAVOR {
            Flavor::TrueType
        } else if tag == CFF_FLAVOR {
            Flavor::Cff
        } else {
            Flavor::Unknown(flavor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_flavors() {
        assert_eq!(Flavor::from_u32(0x00010000), Flavor::TrueType);
        assert_eq!(Flavor::from_u32(0x74727565), Flavor::TrueType);
        assert_eq!(Flavor::from_u32(0x4F54544F), Flavor::Cff);
        assert_eq!(Flavor::from_u32(0x74746366), Flavor::Unknown(0x74746366));
    }
}
