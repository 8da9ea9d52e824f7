// Builders for binary layout tables.

pub mod writer {
    // The writer module is derived from ttf-parser, licenced under Apache-2.0.
    // https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/writer.rs

    #[derive(Clone, Copy, Debug)]
    pub enum TtfType {
        Int16(i16),
        UInt16(u16),
        UInt32(u32),
    }

    pub fn convert_type(value: TtfType, data: &mut Vec<u8>) {
        match value {
            TtfType::Int16(n) => {
                data.extend_from_slice(&i16::to_be_bytes(n));
            }
            TtfType::UInt16(n) => {
                data.extend_from_slice(&u16::to_be_bytes(n));
            }
            TtfType::UInt32(n) => {
                data.extend_from_slice(&u32::to_be_bytes(n));
            }
        }
    }

    #[derive(Debug)]
    pub struct Writer {
        pub data: Vec<u8>,
    }

    impl Writer {
        pub fn new() -> Self {
            Writer {
                data: Vec::with_capacity(256),
            }
        }

        pub fn write(&mut self, value: TtfType) {
            convert_type(value, &mut self.data);
        }

        pub fn write_u16s(&mut self, values: &[u16]) {
            for &value in values {
                self.write(TtfType::UInt16(value));
            }
        }

        pub fn write_bytes(&mut self, bytes: &[u8]) {
            self.data.extend_from_slice(bytes);
        }
    }
}

use writer::TtfType::{Int16, UInt16, UInt32};
use writer::Writer;

/// A language system table: required feature index and feature indices.
#[derive(Clone, Debug)]
pub struct LangSysDef {
    pub required_feature: u16,
    pub feature_indices: Vec<u16>,
}

/// A script: its tag, optional default language system and tagged language systems.
#[derive(Clone, Debug)]
pub struct ScriptDef {
    pub tag: u32,
    pub default: Option<LangSysDef>,
    pub languages: Vec<(u32, LangSysDef)>,
}

/// A lookup table: raw type, flag and already encoded subtables.
#[derive(Clone, Debug)]
pub struct LookupDef {
    pub lookup_type: u16,
    pub flag: u16,
    pub subtables: Vec<Vec<u8>>,
}

impl LangSysDef {
    pub fn new(required_feature: u16, feature_indices: &[u16]) -> Self {
        LangSysDef {
            required_feature,
            feature_indices: feature_indices.to_vec(),
        }
    }
}

impl LookupDef {
    pub fn new(lookup_type: u16, subtables: Vec<Vec<u8>>) -> Self {
        LookupDef {
            lookup_type,
            flag: 0,
            subtables,
        }
    }
}

fn offset16(offset: usize) -> u16 {
    u16::try_from(offset).expect("offset does not fit in 16 bits")
}

/// Place `tables` one after another following a header of `header_len` bytes.
///
/// Returns the offset of each table from the start of the header, and the tables' data.
fn place_tables(header_len: usize, tables: &[Vec<u8>]) -> (Vec<u16>, Vec<u8>) {
    let mut offsets = Vec::with_capacity(tables.len());
    let mut data = Vec::new();
    for table in tables {
        offsets.push(offset16(header_len + data.len()));
        data.extend_from_slice(table);
    }
    (offsets, data)
}

pub fn coverage_format1(glyphs: &[u16]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write(UInt16(1));
    w.write(UInt16(glyphs.len() as u16));
    w.write_u16s(glyphs);
    w.data
}

/// Coverage format 2 from `(start, end, start_coverage_index)` ranges.
pub fn coverage_format2(ranges: &[(u16, u16, u16)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write(UInt16(2));
    w.write(UInt16(ranges.len() as u16));
    for &(start, end, start_coverage_index) in ranges {
        w.write_u16s(&[start, end, start_coverage_index]);
    }
    w.data
}

/// Single substitution format 1 with `coverage` placed after the subtable header.
pub fn single_subst_format1(coverage: &[u8], delta_glyph_id: i16) -> Vec<u8> {
    let mut w = Writer::new();
    w.write(UInt16(1));
    w.write(UInt16(6));
    w.write(Int16(delta_glyph_id));
    w.write_bytes(coverage);
    w.data
}

/// Single substitution format 2 with `coverage` placed after the substitute glyph array.
pub fn single_subst_format2(coverage: &[u8], substitutes: &[u16]) -> Vec<u8> {
    let header_len = 6 + 2 * substitutes.len();
    let mut w = Writer::new();
    w.write(UInt16(2));
    w.write(UInt16(offset16(header_len)));
    w.write(UInt16(substitutes.len() as u16));
    w.write_u16s(substitutes);
    w.write_bytes(coverage);
    w.data
}

fn langsys_table(langsys: &LangSysDef) -> Vec<u8> {
    let mut w = Writer::new();
    w.write(UInt16(0)); // lookup order
    w.write(UInt16(langsys.required_feature));
    w.write(UInt16(langsys.feature_indices.len() as u16));
    w.write_u16s(&langsys.feature_indices);
    w.data
}

fn script_table(script: &ScriptDef) -> Vec<u8> {
    let header_len = 4 + 6 * script.languages.len();
    let mut tables: Vec<Vec<u8>> = script
        .languages
        .iter()
        .map(|(_, langsys)| langsys_table(langsys))
        .collect();
    if let Some(default) = &script.default {
        tables.push(langsys_table(default));
    }
    let (offsets, data) = place_tables(header_len, &tables);

    let mut w = Writer::new();
    w.write(UInt16(match script.default {
        Some(_) => offsets[script.languages.len()],
        None => 0,
    }));
    w.write(UInt16(script.languages.len() as u16));
    for ((tag, _), offset) in script.languages.iter().zip(&offsets) {
        w.write(UInt32(*tag));
        w.write(UInt16(*offset));
    }
    w.write_bytes(&data);
    w.data
}

fn script_list(scripts: &[ScriptDef]) -> Vec<u8> {
    let tables: Vec<Vec<u8>> = scripts.iter().map(script_table).collect();
    let (offsets, data) = place_tables(2 + 6 * scripts.len(), &tables);

    let mut w = Writer::new();
    w.write(UInt16(scripts.len() as u16));
    for (script, offset) in scripts.iter().zip(offsets) {
        w.write(UInt32(script.tag));
        w.write(UInt16(offset));
    }
    w.write_bytes(&data);
    w.data
}

fn feature_list(features: &[(u32, Vec<u16>)]) -> Vec<u8> {
    let tables: Vec<Vec<u8>> = features
        .iter()
        .map(|(_, lookup_indices)| {
            let mut w = Writer::new();
            w.write(UInt16(0)); // feature params
            w.write(UInt16(lookup_indices.len() as u16));
            w.write_u16s(lookup_indices);
            w.data
        })
        .collect();
    let (offsets, data) = place_tables(2 + 6 * features.len(), &tables);

    let mut w = Writer::new();
    w.write(UInt16(features.len() as u16));
    for ((tag, _), offset) in features.iter().zip(offsets) {
        w.write(UInt32(*tag));
        w.write(UInt16(offset));
    }
    w.write_bytes(&data);
    w.data
}

fn lookup_table(lookup: &LookupDef) -> Vec<u8> {
    let (offsets, data) = place_tables(6 + 2 * lookup.subtables.len(), &lookup.subtables);

    let mut w = Writer::new();
    w.write(UInt16(lookup.lookup_type));
    w.write(UInt16(lookup.flag));
    w.write(UInt16(lookup.subtables.len() as u16));
    w.write_u16s(&offsets);
    w.write_bytes(&data);
    w.data
}

fn lookup_list(lookups: &[LookupDef]) -> Vec<u8> {
    let tables: Vec<Vec<u8>> = lookups.iter().map(lookup_table).collect();
    let (offsets, data) = place_tables(2 + 2 * lookups.len(), &tables);

    let mut w = Writer::new();
    w.write(UInt16(lookups.len() as u16));
    w.write_u16s(&offsets);
    w.write_bytes(&data);
    w.data
}

/// A `GSUB` or `GPOS` style table: version 1.0 header followed by the script, feature and
/// lookup lists, in that order.
pub fn build_layout_table(
    scripts: &[ScriptDef],
    features: &[(u32, Vec<u16>)],
    lookups: &[LookupDef],
) -> Vec<u8> {
    let lists = [script_list(scripts), feature_list(features), lookup_list(lookups)];
    let (offsets, data) = place_tables(10, &lists);

    let mut w = Writer::new();
    w.write(UInt32(0x00010000));
    w.write_u16s(&offsets);
    w.write_bytes(&data);
    w.data
}
