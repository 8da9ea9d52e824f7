//! `GSUB` lookup type 1: single substitution.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#lookuptype-1-single-substitution-subtable>

use log::{trace, warn};
use serde_json::{Map, Value};

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadScope};
use crate::binary::U16Be;
use crate::coverage::{Coverage, CoverageCache};
use crate::error::ParseError;
use crate::glyph_names::GlyphNameSource;
use crate::layout::{Lookup, Subtable};
use crate::registry::{LookupBody, LookupCodec};

pub const TYPE_NAME: &str = "gsub_single";

/// A single substitution subtable.
///
/// `from` and `to` pair up by position: the glyph at index `i` of `from` is replaced with the
/// glyph at index `i` of `to`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleSubst {
    pub from: Coverage,
    pub to: Coverage,
}

/// The `LookupCodec` for single substitution lookups.
pub struct SingleSubstCodec;

impl ReadBinary for SingleSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        SingleSubst::read_with_cache(ctxt, &mut CoverageCache::default())
    }
}

impl SingleSubst {
    /// Read a subtable, taking its coverage from `coverages` when another subtable of the same
    /// lookup has already read it.
    pub fn read_with_cache(
        ctxt: &mut ReadCtxt<'_>,
        coverages: &mut CoverageCache,
    ) -> Result<SingleSubst, ParseError> {
        let subtable = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let delta_glyph_index = ctxt.read_i16be()?;
                let from = coverages.read(subtable.offset(coverage_offset));
                // Addition of deltaGlyphID is modulo 65536
                let to = Coverage::from_glyph_ids(
                    from.glyph_ids()
                        .map(|glyph| glyph.wrapping_add_signed(delta_glyph_index)),
                );
                Ok(SingleSubst { from, to })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let substitute_glyph_array = ctxt.read_array::<U16Be>(glyph_count)?;
                let from = coverages.read(subtable.offset(coverage_offset));
                let to = Coverage::from_glyph_ids(substitute_glyph_array.iter());
                Ok(SingleSubst::new(from, to))
            }
            _ => Err(ParseError::BadVersion),
        }
    }

    /// Pair `from` with `to`, dropping glyphs from the longer coverage that have no partner.
    pub fn new(mut from: Coverage, mut to: Coverage) -> SingleSubst {
        if from.len() != to.len() {
            warn!(
                "single substitution maps {} glyphs to {}, truncating",
                from.len(),
                to.len()
            );
            let len = from.len().min(to.len());
            from.truncate(len);
            to.truncate(len);
        }
        SingleSubst { from, to }
    }

    /// The substitutions as (input glyph, output glyph) pairs, in coverage order.
    pub fn substitutions(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.from.glyph_ids().zip(self.to.glyph_ids())
    }

    fn from_document(node: &Value) -> Option<SingleSubst> {
        let node = node.as_object()?;
        let from = Coverage::from_document(node.get("from")?);
        let to = Coverage::from_document(node.get("to")?);
        Some(SingleSubst::new(from, to))
    }

    fn to_document(&self) -> Value {
        let mut node = Map::new();
        node.insert("from".to_string(), self.from.to_document());
        node.insert("to".to_string(), self.to.to_document());
        Value::Object(node)
    }
}

impl LookupCodec for SingleSubstCodec {
    fn type_name(&self) -> Option<&'static str> {
        Some(TYPE_NAME)
    }

    fn read_subtables(
        &self,
        lookup: ReadScope<'_>,
        subtable_offsets: &ReadArray<'_, U16Be>,
    ) -> Vec<Subtable> {
        let mut subtables = Vec::with_capacity(subtable_offsets.len());
        let mut coverages = CoverageCache::default();
        for subtable_offset in subtable_offsets {
            let mut ctxt = lookup.offset(usize::from(subtable_offset)).ctxt();
            match SingleSubst::read_with_cache(&mut ctxt, &mut coverages) {
                Ok(subtable) => subtables.push(Subtable::SingleSubst(subtable)),
                Err(err) => warn!("skipping invalid subtable: {}", err),
            }
        }
        subtables
    }

    fn from_document(&self, node: &Map<String, Value>) -> Option<LookupBody> {
        let subtables = node.get("subtables")?.as_array()?;
        let flags = node
            .get("flags")
            .and_then(Value::as_u64)
            .and_then(|flags| u16::try_from(flags).ok())
            .unwrap_or(0);
        let subtables = subtables
            .iter()
            .filter_map(|subtable| {
                let subtable = SingleSubst::from_document(subtable);
                if subtable.is_none() {
                    warn!("skipping invalid {} subtable", TYPE_NAME);
                }
                subtable
            })
            .map(Subtable::SingleSubst)
            .collect();
        Some(LookupBody { flags, subtables })
    }

    fn to_document(&self, lookup: &Lookup, node: &mut Map<String, Value>) {
        node.insert("type".to_string(), Value::from(TYPE_NAME));
        if lookup.flags != 0 {
            node.insert("flags".to_string(), Value::from(lookup.flags));
        }
        let subtables = single_substs(lookup)
            .map(SingleSubst::to_document)
            .collect();
        node.insert("subtables".to_string(), Value::Array(subtables));
    }

    fn dispose(&self, lookup: &mut Lookup) {
        trace!(
            "disposing {} single substitution subtables of '{}'",
            lookup.subtables.len(),
            lookup.name
        );
        lookup.subtables.clear();
    }

    fn name_glyphs(&self, lookup: &mut Lookup, names: &dyn GlyphNameSource) {
        for subtable in single_substs_mut(lookup) {
            subtable.from.name_glyphs(names);
            subtable.to.name_glyphs(names);
        }
    }

    fn resolve_glyph_ids(&self, lookup: &mut Lookup, names: &dyn GlyphNameSource) {
        for subtable in single_substs_mut(lookup) {
            subtable.from.resolve_glyph_ids(names);
            subtable.to.resolve_glyph_ids(names);
        }
    }
}

fn single_substs(lookup: &Lookup) -> impl Iterator<Item = &SingleSubst> {
    lookup.subtables.iter().map(|subtable| match subtable {
        Subtable::SingleSubst(subst) => subst,
    })
}

fn single_substs_mut(lookup: &mut Lookup) -> impl Iterator<Item = &mut SingleSubst> {
    lookup.subtables.iter_mut().map(|subtable| match subtable {
        Subtable::SingleSubst(subst) => subst,
    })
}
