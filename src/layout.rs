//! The script, feature and lookup graph shared by the `GSUB` and `GPOS` tables.
//!
//! A `Table` owns its language systems, features and lookups. References between them are
//! indices into the owning table's vectors, never copies, so a table can be dropped as a unit
//! and references cannot outlive it.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2>

use std::fmt;

use crate::binary::read::ReadScope;
use crate::error::{LayoutError, ParseError};
use crate::glyph_names::GlyphNameSource;
use crate::gsub_single::SingleSubst;
use crate::registry;
use crate::tag;

mod document;
mod read;

pub use document::LayoutDocument;

/// Numeric lookup type: the type field of the lookup table offset by a `LookupTypeBase`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupType(pub u32);

impl LookupType {
    pub const UNKNOWN: LookupType = LookupType(0x00);
    pub const GSUB_UNKNOWN: LookupType = LookupType(0x10);
    pub const GSUB_SINGLE: LookupType = LookupType(0x11);
    pub const GPOS_UNKNOWN: LookupType = LookupType(0x20);
}

impl fmt::LowerHex for LookupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Selects the namespace that raw lookup type numbers are interpreted in.
///
/// `GSUB` lookup type 1 and `GPOS` lookup type 1 are unrelated, so the caller states which
/// table the data came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LookupTypeBase {
    Unknown,
    Gsub,
    Gpos,
}

impl LookupTypeBase {
    pub fn from_table_tag(table_tag: u32) -> LookupTypeBase {
        match table_tag {
            tag::GSUB => LookupTypeBase::Gsub,
            tag::GPOS => LookupTypeBase::Gpos,
            _ => LookupTypeBase::Unknown,
        }
    }

    pub fn lookup_type(self, raw_type: u16) -> LookupType {
        LookupType(self.base().0 + u32::from(raw_type))
    }

    fn base(self) -> LookupType {
        match self {
            LookupTypeBase::Unknown => LookupType::UNKNOWN,
            LookupTypeBase::Gsub => LookupType::GSUB_UNKNOWN,
            LookupTypeBase::Gpos => LookupType::GPOS_UNKNOWN,
        }
    }
}

/// Index of a `Feature` in `Table::features`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureIndex(pub usize);

/// Index of a `Lookup` in `Table::lookups`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupIndex(pub usize);

#[derive(Debug, Default)]
pub struct Table {
    pub languages: Vec<LanguageSystem>,
    pub features: Vec<Feature>,
    pub lookups: Vec<Lookup>,
}

/// A (script, language) pair and the features enabled for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSystem {
    pub name: String,
    pub required_feature: Option<FeatureIndex>,
    /// `None` marks a feature index that did not refer to a feature.
    pub features: Vec<Option<FeatureIndex>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    /// `None` marks a lookup index that did not refer to a lookup.
    pub lookups: Vec<Option<LookupIndex>>,
}

#[derive(Debug)]
pub struct Lookup {
    pub name: String,
    pub lookup_type: LookupType,
    pub flags: u16,
    /// Decoded by the codec registered for `lookup_type`.
    pub subtables: Vec<Subtable>,
}

/// The subtable payload of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subtable {
    SingleSubst(SingleSubst),
}

impl Drop for Lookup {
    fn drop(&mut self) {
        registry::codec(self.lookup_type).dispose(self);
    }
}

impl Table {
    pub fn new() -> Table {
        Table::default()
    }

    /// Read the layout graph from the binary data of a `GSUB`, `GPOS` or similar table.
    pub fn read(data: &[u8], type_base: LookupTypeBase) -> Result<Table, LayoutError> {
        let table = ReadScope::new(data).read_dep::<Table>(type_base)?;
        debug_assert!(table.check_references().is_ok());
        Ok(table)
    }

    /// Read the layout graph of the table identified by `table_tag`.
    pub fn read_tagged(data: &[u8], table_tag: u32) -> Result<Table, LayoutError> {
        Table::read(data, LookupTypeBase::from_table_tag(table_tag))
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty() && self.features.is_empty() && self.lookups.is_empty()
    }

    pub fn feature(&self, index: FeatureIndex) -> Option<&Feature> {
        self.features.get(index.0)
    }

    pub fn lookup(&self, index: LookupIndex) -> Option<&Lookup> {
        self.lookups.get(index.0)
    }

    pub fn find_language(&self, name: &str) -> Option<&LanguageSystem> {
        self.languages.iter().find(|language| language.name == name)
    }

    pub fn find_feature(&self, name: &str) -> Option<FeatureIndex> {
        self.features
            .iter()
            .position(|feature| feature.name == name)
            .map(FeatureIndex)
    }

    pub fn find_lookup(&self, name: &str) -> Option<LookupIndex> {
        self.lookups
            .iter()
            .position(|lookup| lookup.name == name)
            .map(LookupIndex)
    }

    /// The features of `language` that are present, in order. Does not include the required
    /// feature.
    pub fn language_features<'a>(
        &'a self,
        language: &'a LanguageSystem,
    ) -> impl Iterator<Item = &'a Feature> + 'a {
        language
            .features
            .iter()
            .flatten()
            .filter_map(move |&index| self.feature(index))
    }

    /// The lookups of `feature` that are present, in order.
    pub fn feature_lookups<'a>(&'a self, feature: &'a Feature) -> impl Iterator<Item = &'a Lookup> + 'a {
        feature
            .lookups
            .iter()
            .flatten()
            .filter_map(move |&index| self.lookup(index))
    }

    /// Check that every reference held by a language system or feature is within this table.
    pub fn check_references(&self) -> Result<(), ParseError> {
        for language in &self.languages {
            let indices = language.required_feature.iter().chain(language.features.iter().flatten());
            for index in indices {
                if self.feature(*index).is_none() {
                    return Err(ParseError::BadIndex);
                }
            }
        }
        for feature in &self.features {
            for index in feature.lookups.iter().flatten() {
                if self.lookup(*index).is_none() {
                    return Err(ParseError::BadIndex);
                }
            }
        }
        Ok(())
    }

    /// Name every glyph held by the lookups of this table, in preparation for `to_document`.
    pub fn name_glyphs(&mut self, names: &dyn GlyphNameSource) {
        for lookup in &mut self.lookups {
            registry::codec(lookup.lookup_type).name_glyphs(lookup, names);
        }
    }

    /// Resolve the glyph names held by the lookups of this table, after `from_document`.
    pub fn resolve_glyph_ids(&mut self, names: &dyn GlyphNameSource) {
        for lookup in &mut self.lookups {
            registry::codec(lookup.lookup_type).resolve_glyph_ids(lookup, names);
        }
    }
}

impl Lookup {
    /// The document type name of this lookup, if its type has a codec.
    pub fn type_name(&self) -> Option<&'static str> {
        registry::codec(self.lookup_type).type_name()
    }
}
