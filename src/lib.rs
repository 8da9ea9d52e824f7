#![warn(rust_2018_idioms)]

//! Decoding of the OpenType layout graph: the language systems, features and lookups shared by
//! the `GSUB` and `GPOS` tables.
//!
//! A [`layout::Table`] can be read from the binary table data or reconstructed from a name keyed
//! JSON document, and written back out as such a document.

/// Reading of binary data.
pub mod binary;
pub mod coverage;
pub mod error;
pub mod glyph_names;
pub mod gsub_single;
pub mod layout;
pub mod registry;
pub mod size;
pub mod tag;
/// Shared test code.
#[cfg(test)]
pub mod tests;

pub type GlyphId = u16;
