//! Coverage tables: ordered sets of glyphs.
//!
//! A `Coverage` read from binary data holds glyph ids; one read from a document holds glyph
//! names. Either side can be filled in from the other through a `GlyphNameSource`.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table>

use std::collections::BTreeMap;

use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::binary::read::{ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::U16Be;
use crate::error::ParseError;
use crate::glyph_names::GlyphNameSource;
use crate::GlyphId;

/// A glyph in a coverage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageGlyph {
    /// Glyph id. Zero on the document path until resolved.
    pub gid: GlyphId,
    /// Glyph name. `None` on the binary path until named, or for a non-string document entry.
    pub name: Option<String>,
}

/// An ordered, deduplicated sequence of glyphs.
///
/// The order is coverage index order, which other tables rely on to pair per-glyph data with
/// the glyphs covered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    glyphs: Vec<CoverageGlyph>,
}

pub struct CoverageRangeRecord {
    start_glyph: u16,
    end_glyph: u16,
    start_coverage_index: u16,
}

impl ReadFrom for CoverageRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, start_coverage_index): (u16, u16, u16)) -> Self {
        CoverageRangeRecord {
            start_glyph,
            end_glyph,
            start_coverage_index,
        }
    }
}

impl CoverageRangeRecord {
    /// The coverage index assigned to `glyph` by this range.
    ///
    /// This is `startCoverageIndex + glyph`, not `startCoverageIndex + (glyph - start)`. The
    /// two agree on the order of glyphs within a range but not across ranges; the former is
    /// what existing dumps were produced with.
    fn coverage_index(&self, glyph: GlyphId) -> u32 {
        u32::from(self.start_coverage_index) + u32::from(glyph)
    }
}

/// Accumulates glyphs keyed by coverage index, keeping the first index seen for each glyph.
struct CoverageBuilder {
    seen: FxHashMap<GlyphId, u32>,
    entries: Vec<(u32, GlyphId)>,
}

impl CoverageBuilder {
    fn with_capacity(capacity: usize) -> Self {
        CoverageBuilder {
            seen: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            entries: Vec::with_capacity(capacity),
        }
    }

    fn insert(&mut self, glyph: GlyphId, coverage_index: u32) {
        if !self.seen.contains_key(&glyph) {
            self.seen.insert(glyph, coverage_index);
            self.entries.push((coverage_index, glyph));
        }
    }

    fn finish(mut self) -> Coverage {
        // Stable, so glyphs that share an index stay in insertion order
        self.entries.sort_by_key(|&(coverage_index, _)| coverage_index);
        Coverage::from_glyph_ids(self.entries.into_iter().map(|(_, glyph)| glyph))
    }
}

/// Glyphs inserted by earlier ranges of a format 2 coverage, as disjoint, merged intervals.
#[derive(Default)]
struct CoveredGlyphs {
    // start -> end, inclusive
    intervals: BTreeMap<u16, u16>,
}

impl CoveredGlyphs {
    /// Mark `start..=end` as covered, calling `insert` for each glyph of it that was not covered
    /// already, in ascending order.
    fn cover(&mut self, start: GlyphId, end: GlyphId, mut insert: impl FnMut(GlyphId)) {
        if start > end {
            return;
        }
        let (start, end) = (u32::from(start), u32::from(end));
        let mut next = start;
        let mut merged = (start, end);
        let mut absorbed = Vec::new();

        // The interval starting at or before `start` may overlap or touch the range
        let first = self
            .intervals
            .range(..=start as u16) // cast safe, start came from a u16
            .next_back()
            .filter(|&(_, &covered_end)| u32::from(covered_end) + 1 >= start)
            .map_or(start as u16, |(&covered_start, _)| covered_start);
        for (&covered_start, &covered_end) in self.intervals.range(first..) {
            let (covered_start, covered_end) = (u32::from(covered_start), u32::from(covered_end));
            if covered_start > end + 1 {
                break;
            }
            for glyph in next..covered_start.min(end + 1) {
                insert(glyph as GlyphId); // cast safe, glyph <= end
            }
            next = next.max(covered_end + 1);
            merged = (merged.0.min(covered_start), merged.1.max(covered_end));
            absorbed.push(covered_start as u16);
        }
        for glyph in next..=end {
            insert(glyph as GlyphId);
        }

        for covered_start in absorbed {
            self.intervals.remove(&covered_start);
        }
        self.intervals.insert(merged.0 as u16, merged.1 as u16);
    }
}

/// Coverages read so far within one lookup, keyed by their position in the table.
///
/// Subtables of a lookup often share a coverage table.
#[derive(Default)]
pub struct CoverageCache {
    coverages: FxHashMap<usize, Coverage>,
}

impl CoverageCache {
    /// Read the coverage at `scope` as `Coverage::read` does, reusing an earlier read of the
    /// same table.
    pub fn read(&mut self, scope: ReadScope<'_>) -> Coverage {
        self.coverages
            .entry(scope.base())
            .or_insert_with(|| Coverage::read(scope))
            .clone()
    }
}

impl ReadBinary for Coverage {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        match ctxt.read_u16be()? {
            1 => {
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let glyph_array = ctxt.read_array::<U16Be>(glyph_count)?;
                let mut builder = CoverageBuilder::with_capacity(glyph_count);
                for (index, glyph) in glyph_array.iter().enumerate() {
                    // A repeated glyph keeps its first index and does not shift later ones
                    builder.insert(glyph, index as u32); // cast safe, count is a u16
                }
                Ok(builder.finish())
            }
            2 => {
                let coverage_range_count = usize::from(ctxt.read_u16be()?);
                let coverage_range_array =
                    ctxt.read_array::<CoverageRangeRecord>(coverage_range_count)?;
                let mut builder = CoverageBuilder::with_capacity(coverage_range_count);
                let mut covered = CoveredGlyphs::default();
                // Only glyphs not covered by an earlier range are visited, first insertion wins
                for range in coverage_range_array.iter() {
                    covered.cover(range.start_glyph, range.end_glyph, |glyph| {
                        builder.insert(glyph, range.coverage_index(glyph))
                    });
                }
                Ok(builder.finish())
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl Coverage {
    /// Read a coverage table, treating any problem with it as an empty coverage.
    ///
    /// `scope` starts at the coverage table and ends at the end of the enclosing table.
    pub fn read(scope: ReadScope<'_>) -> Coverage {
        // Format and count must both be present
        if scope.data().len() < 4 {
            debug!("coverage at {} is truncated, treating as empty", scope.base());
            return Coverage::default();
        }
        match scope.read::<Coverage>() {
            Ok(coverage) => coverage,
            Err(err) => {
                debug!("unusable coverage at {}: {}", scope.base(), err);
                Coverage::default()
            }
        }
    }

    /// Construct a coverage from glyph ids that are already in coverage order.
    pub fn from_glyph_ids(glyphs: impl IntoIterator<Item = GlyphId>) -> Coverage {
        let glyphs = glyphs
            .into_iter()
            .map(|gid| CoverageGlyph { gid, name: None })
            .collect();
        Coverage { glyphs }
    }

    /// Construct a coverage from a document array of glyph names.
    ///
    /// Entries that are not strings become anonymous glyphs. Anything other than an array
    /// yields an empty coverage.
    pub fn from_document(value: &Value) -> Coverage {
        let glyphs = value
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| CoverageGlyph {
                        gid: 0,
                        name: entry.as_str().map(str::to_owned),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Coverage { glyphs }
    }

    /// The glyph names of this coverage as a document array.
    ///
    /// Names must have been filled in beforehand, see `name_glyphs`. Anonymous glyphs are
    /// written as empty strings.
    pub fn to_document(&self) -> Value {
        Value::Array(
            self.glyphs
                .iter()
                .map(|glyph| Value::from(glyph.name.as_deref().unwrap_or_default()))
                .collect(),
        )
    }

    /// Fill in the name of every glyph from its id.
    pub fn name_glyphs(&mut self, names: &dyn GlyphNameSource) {
        for glyph in &mut self.glyphs {
            glyph.name = names.glyph_name(glyph.gid).map(|name| name.into_owned());
        }
    }

    /// Fill in the id of every named glyph from its name.
    ///
    /// Names that are not known keep glyph id 0.
    pub fn resolve_glyph_ids(&mut self, names: &dyn GlyphNameSource) {
        for glyph in &mut self.glyphs {
            glyph.gid = match glyph.name.as_deref() {
                Some(name) => names.glyph_id(name).unwrap_or_else(|| {
                    warn!("unknown glyph name '{}'", name);
                    0
                }),
                None => 0,
            };
        }
    }

    pub fn glyphs(&self) -> &[CoverageGlyph] {
        &self.glyphs
    }

    pub fn glyph_ids(&self) -> impl Iterator<Item = GlyphId> + '_ {
        self.glyphs.iter().map(|glyph| glyph.gid)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Shorten the coverage to `len` glyphs, keeping the first ones.
    pub fn truncate(&mut self, len: usize) {
        self.glyphs.truncate(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph_names::GlyphOrder;
    use crate::tests::{coverage_format1, coverage_format2};
    use serde_json::json;

    fn read_coverage(data: &[u8]) -> Coverage {
        Coverage::read(ReadScope::new(data))
    }

    #[test]
    fn test_format1_keeps_list_order() {
        let coverage = read_coverage(&coverage_format1(&[5, 9, 2, 7]));
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), vec![5, 9, 2, 7]);
    }

    #[test]
    fn test_format1_duplicates_collapse_to_first() {
        let coverage = read_coverage(&coverage_format1(&[4, 6, 4, 8, 6]));
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), vec![4, 6, 8]);
    }

    #[test]
    fn test_format2_single_range() {
        let coverage = read_coverage(&coverage_format2(&[(10, 12, 100)]));
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), vec![10, 11, 12]);
    }

    #[test]
    fn test_range_coverage_index_formula() {
        let range = CoverageRangeRecord {
            start_glyph: 10,
            end_glyph: 12,
            start_coverage_index: 100,
        };
        assert_eq!(range.coverage_index(10), 110);
        assert_eq!(range.coverage_index(11), 111);
        assert_eq!(range.coverage_index(12), 112);
    }

    // With startCoverageIndex + glyph the second range (indices 2 + 3..=4) sorts before the
    // first (indices 0 + 20..=21) even though its startCoverageIndex is larger.
    #[test]
    fn test_format2_orders_by_index_formula_across_ranges() {
        let coverage = read_coverage(&coverage_format2(&[(20, 21, 0), (3, 4, 2)]));
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), vec![3, 4, 20, 21]);
    }

    #[test]
    fn test_format2_overlapping_ranges_first_wins() {
        let coverage = read_coverage(&coverage_format2(&[(5, 7, 0), (6, 8, 50)]));
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_format2_inverted_range_is_empty() {
        let coverage = read_coverage(&coverage_format2(&[(9, 3, 0)]));
        assert!(coverage.is_empty());
    }

    // The second range only adds 0..=9 and 21..=30, the third only 31..=40
    #[test]
    fn test_format2_partially_covered_ranges() {
        let coverage = read_coverage(&coverage_format2(&[(10, 20, 0), (0, 30, 100), (15, 40, 0)]));
        let expected: Vec<u16> = (10..=20).chain(31..=40).chain(0..=9).chain(21..=30).collect();
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_format2_adjacent_ranges() {
        let coverage = read_coverage(&coverage_format2(&[(5, 9, 10), (0, 4, 0), (0, 9, 0), (10, 10, 0)]));
        let expected: Vec<u16> = (0..=4).chain(10..=10).chain(5..=9).collect();
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_format2_repeated_full_ranges() {
        let ranges = vec![(0, 0xFFFE, 0); 2000];
        let coverage = read_coverage(&coverage_format2(&ranges));
        assert_eq!(coverage.len(), 0xFFFF);
        assert!(coverage.glyph_ids().eq(0..=0xFFFE));

        let coverage = read_coverage(&coverage_format2(&[(0xFFFF, 0xFFFF, 1), (0xFFF0, 0xFFFF, 0)]));
        assert!(coverage.glyph_ids().eq(0xFFF0..=0xFFFF));
    }

    #[test]
    fn test_cache_reads_each_table_once() {
        let mut data = coverage_format1(&[7, 3]);
        data.extend(coverage_format1(&[4]));
        let scope = ReadScope::new(&data);
        let mut cache = CoverageCache::default();
        let first = cache.read(scope);
        let second = cache.read(scope.offset(0));
        let other = cache.read(scope.offset(8));
        assert_eq!(first, second);
        assert!(first.glyph_ids().eq([7, 3]));
        assert!(other.glyph_ids().eq([4]));
        assert_eq!(cache.coverages.len(), 2);
    }

    #[test]
    fn test_unknown_format_is_empty() {
        let data = [0x00, 0x03, 0x00, 0x01, 0x00, 0x05];
        assert!(read_coverage(&data).is_empty());
        assert_eq!(
            ReadScope::new(&data).read::<Coverage>(),
            Err(ParseError::BadVersion)
        );
    }

    #[test]
    fn test_truncated_is_empty() {
        let mut data = coverage_format1(&[1, 2, 3]);
        data.truncate(data.len() - 1);
        assert!(read_coverage(&data).is_empty());
        assert!(read_coverage(&[0x00, 0x01]).is_empty());
        assert!(read_coverage(&[]).is_empty());
    }

    #[test]
    fn test_from_document() {
        let coverage = Coverage::from_document(&json!(["a", 3, "b"]));
        let names: Vec<_> = coverage
            .glyphs()
            .iter()
            .map(|glyph| glyph.name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("a"), None, Some("b")]);
        assert!(coverage.glyph_ids().all(|gid| gid == 0));

        assert!(Coverage::from_document(&json!({"a": "b"})).is_empty());
    }

    #[test]
    fn test_names_both_ways() {
        let order = GlyphOrder::new([".notdef", "a", "b", "c"]);
        let mut coverage = Coverage::from_glyph_ids([3, 1]);
        assert_eq!(coverage.to_document(), json!(["", ""]));

        coverage.name_glyphs(&order);
        assert_eq!(coverage.to_document(), json!(["c", "a"]));

        let mut coverage = Coverage::from_document(&json!(["b", "zzz", "c"]));
        coverage.resolve_glyph_ids(&order);
        assert_eq!(coverage.glyph_ids().collect::<Vec<_>>(), vec![2, 0, 3]);
    }
}
