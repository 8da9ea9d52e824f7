#![deny(missing_docs)]

//! Mapping between glyph ids and glyph names.
//!
//! Layout documents refer to glyphs by name while the binary tables refer to them by id. The
//! layout code never decides what a glyph is called; it asks a `GlyphNameSource`.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::GlyphId;

/// A bidirectional glyph id to glyph name table.
pub trait GlyphNameSource {
    /// The name of `gid`, if it has one.
    fn glyph_name(&self, gid: GlyphId) -> Option<Cow<'_, str>>;

    /// The id of the glyph called `name`, if there is one.
    fn glyph_id(&self, name: &str) -> Option<GlyphId>;
}

/// Glyph names in glyph id order, as found in a font's glyph order.
pub struct GlyphOrder {
    names: Vec<String>,
    ids: FxHashMap<String, GlyphId>,
}

impl GlyphOrder {
    /// Construct a new `GlyphOrder` from names indexed by glyph id.
    ///
    /// Names must be unique for the reverse lookup to work, so repeated names are renamed with an
    /// `.altNN` suffix. Names beyond the range of a glyph id are ignored.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names = unique_glyph_names(
            names
                .into_iter()
                .take(usize::from(GlyphId::MAX) + 1)
                .map(Into::into),
        );
        let ids = names
            .iter()
            .enumerate()
            .map(|(gid, name)| (name.clone(), gid as GlyphId)) // cast safe due to `take` above
            .collect();
        GlyphOrder { names, ids }
    }

    /// The number of glyphs in the glyph order.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the glyph order has no glyphs.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl GlyphNameSource for GlyphOrder {
    fn glyph_name(&self, gid: GlyphId) -> Option<Cow<'_, str>> {
        self.names
            .get(usize::from(gid))
            .map(|name| Cow::from(name.as_str()))
    }

    fn glyph_id(&self, name: &str) -> Option<GlyphId> {
        self.ids.get(name).copied()
    }
}

fn unique_glyph_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = FxHashMap::<String, usize>::default();
    let mut unique_names = Vec::new();

    for name in names {
        let alt = *seen
            .entry(name.clone())
            .and_modify(|alt| *alt += 1)
            .or_insert(0);
        if alt == 0 {
            unique_names.push(name);
        } else {
            // name is not unique, generate a new name for it
            unique_names.push(format!("{}.alt{:02}", name, alt));
        }
    }

    unique_names
}
