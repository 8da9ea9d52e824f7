//! Dispatch of lookup subtable handling by lookup type.
//!
//! The layout graph itself does not know how to read or write the subtables of any lookup
//! type. Each type that is understood has a `LookupCodec` in the static `CODECS` table; every
//! other type is handled by `UnknownLookup`, which drops the subtables.

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::binary::read::{ReadArray, ReadScope};
use crate::binary::U16Be;
use crate::glyph_names::GlyphNameSource;
use crate::gsub_single::SingleSubstCodec;
use crate::layout::{Lookup, LookupType, Subtable};

/// The part of a lookup decoded from a document by a `LookupCodec`.
pub struct LookupBody {
    pub flags: u16,
    pub subtables: Vec<Subtable>,
}

/// Reading and writing of the subtables of one lookup type.
pub trait LookupCodec: Sync {
    /// Name of the type in documents. `None` for types that cannot be read from documents.
    fn type_name(&self) -> Option<&'static str>;

    /// Read the subtables of a lookup. `lookup` is the scope of the lookup table, which the
    /// subtable offsets are relative to. Subtables that cannot be read are skipped.
    fn read_subtables(
        &self,
        lookup: ReadScope<'_>,
        subtable_offsets: &ReadArray<'_, U16Be>,
    ) -> Vec<Subtable>;

    /// Decode the body of a lookup from its document node. `None` skips the lookup.
    fn from_document(&self, node: &Map<String, Value>) -> Option<LookupBody>;

    /// Write the body of `lookup` into its document node.
    fn to_document(&self, lookup: &Lookup, node: &mut Map<String, Value>);

    /// Release the subtables of `lookup`. Called when the lookup is dropped.
    fn dispose(&self, lookup: &mut Lookup);

    /// Fill in glyph names in the subtables of `lookup` from glyph ids.
    fn name_glyphs(&self, lookup: &mut Lookup, names: &dyn GlyphNameSource);

    /// Fill in glyph ids in the subtables of `lookup` from glyph names.
    fn resolve_glyph_ids(&self, lookup: &mut Lookup, names: &dyn GlyphNameSource);
}

/// Codec for lookup types without a registered codec.
pub struct UnknownLookup;

static UNKNOWN_LOOKUP: UnknownLookup = UnknownLookup;

static CODECS: &[(LookupType, &dyn LookupCodec)] =
    &[(LookupType::GSUB_SINGLE, &SingleSubstCodec)];

/// The codec for `lookup_type`, `UnknownLookup` if none is registered.
pub fn codec(lookup_type: LookupType) -> &'static dyn LookupCodec {
    CODECS
        .iter()
        .find(|(registered, _)| *registered == lookup_type)
        .map(|&(_, codec)| codec)
        .unwrap_or(&UNKNOWN_LOOKUP)
}

/// The lookup type and codec with document type name `type_name`.
pub fn codec_by_name(type_name: &str) -> Option<(LookupType, &'static dyn LookupCodec)> {
    CODECS
        .iter()
        .find(|(_, codec)| codec.type_name() == Some(type_name))
        .copied()
}

impl LookupCodec for UnknownLookup {
    fn type_name(&self) -> Option<&'static str> {
        None
    }

    fn read_subtables(
        &self,
        lookup: ReadScope<'_>,
        subtable_offsets: &ReadArray<'_, U16Be>,
    ) -> Vec<Subtable> {
        debug!(
            "dropping {} subtables of unsupported lookup at {}",
            subtable_offsets.len(),
            lookup.base()
        );
        Vec::new()
    }

    fn from_document(&self, _node: &Map<String, Value>) -> Option<LookupBody> {
        None
    }

    fn to_document(&self, _lookup: &Lookup, _node: &mut Map<String, Value>) {}

    fn dispose(&self, lookup: &mut Lookup) {
        trace!("disposing lookup '{}'", lookup.name);
        lookup.subtables.clear();
    }

    fn name_glyphs(&self, _lookup: &mut Lookup, _names: &dyn GlyphNameSource) {}

    fn resolve_glyph_ids(&self, _lookup: &mut Lookup, _names: &dyn GlyphNameSource) {}
}
