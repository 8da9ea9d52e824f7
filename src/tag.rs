//! Four byte OpenType tags.

use crate::error::ParseError;
use std::fmt;

/// Generate a 4-byte font table tag from byte string
///
/// Example:
///
/// ```ignore
/// assert_eq!(tag!(b"GSUB"), 0x47535542);
/// ```
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

/// Displays a tag as its four characters, or in hex if any of them is not printable ASCII.
///
/// This is also how tags are spelled in the names of language systems, features and lookups.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    u32::from_be_bytes(chars)
}

pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            let s: String = bytes.iter().copied().map(char::from).collect();
            s.fmt(f)
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

pub const CYRL: u32 = tag!(b"cyrl");
pub const DFLT: u32 = tag!(b"DFLT");
pub const GPOS: u32 = tag!(b"GPOS");
pub const GREK: u32 = tag!(b"grek");
pub const GSUB: u32 = tag!(b"GSUB");
pub const KERN: u32 = tag!(b"kern");
pub const LATN: u32 = tag!(b"latn");
pub const LIGA: u32 = tag!(b"liga");
pub const LOCL: u32 = tag!(b"locl");
pub const SMCP: u32 = tag!(b"smcp");

#[cfg(test)]
mod tests {
    use super::*;

    mod from_string {
        use super::*;

        #[test]
        fn test_four_chars() {
            let tag = from_string("latn").expect("invalid tag");

            assert_eq!(tag, LATN);
        }

        #[test]
        fn test_three_chars() {
            let tag = from_string("BEN").expect("invalid tag");

            assert_eq!(tag, 1111838240);
        }

        #[test]
        fn test_too_long() {
            assert_eq!(from_string("latin"), Err(ParseError::BadValue));
        }
    }

    mod display_tag {
        use crate::tag::{DisplayTag, DFLT, GSUB};

        #[test]
        fn test_ascii() {
            assert_eq!(DisplayTag(GSUB).to_string(), "GSUB".to_string());
            assert_eq!(DisplayTag(DFLT).to_string(), "DFLT".to_string());
        }

        #[test]
        fn test_non_ascii() {
            assert_eq!(DisplayTag(0x12345678).to_string(), "0x12345678".to_string());
        }
    }
}
