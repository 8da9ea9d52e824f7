//! Reading of the layout graph from binary data.
//!
//! The lookup list is read first so that features can refer to lookups, then the feature list
//! so that language systems can refer to features. Lookups are named after the first feature
//! that refers to them, which is why their subtables are only read once every feature has been
//! seen.

use rustc_hash::FxHashSet;

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadScope};
use crate::binary::U16Be;
use crate::error::ParseError;
use crate::layout::{
    Feature, FeatureIndex, LanguageSystem, Lookup, LookupIndex, LookupType, LookupTypeBase,
    Subtable, Table,
};
use crate::registry;
use crate::size;
use crate::tag::DisplayTag;

/// Size of a lookup table header: type, flag and subtable count.
const LOOKUP_HEADER_SIZE: usize = 3 * size::U16;

struct LookupHeader<'a> {
    scope: ReadScope<'a>,
    lookup_type: LookupType,
    lookup_flag: u16,
    subtable_count: usize,
}

struct FeatureRecord {
    feature_tag: u32,
    lookup_indices: Vec<u16>,
}

struct ScriptRecord {
    script_tag: u32,
    opt_default_langsys: Option<LangSys>,
    langsys_records: Vec<LangSysRecord>,
}

struct LangSysRecord {
    langsys_tag: u32,
    langsys_table: LangSys,
}

struct LangSys {
    required_feature_index: u16,
    feature_indices: Vec<u16>,
}

/// Hands out names that have not been handed out before.
#[derive(Default)]
struct UniqueNames {
    seen: FxHashSet<String>,
}

impl UniqueNames {
    fn claim(&mut self, name: String) -> String {
        let mut unique_name = name.clone();
        let mut alt = 0;
        while self.seen.contains(&unique_name) {
            // name is not unique, generate a new name for it
            alt += 1;
            unique_name = format!("{}.alt{:02}", name, alt);
        }
        self.seen.insert(unique_name.clone());
        unique_name
    }
}

impl ReadBinaryDep for Table {
    type Args<'a> = LookupTypeBase;
    type HostType<'a> = Table;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        type_base: LookupTypeBase,
    ) -> Result<Table, ParseError> {
        let table = ctxt.scope();

        let _version = ctxt.read_u32be()?;
        let script_list_offset = usize::from(ctxt.read_u16be()?);
        let feature_list_offset = usize::from(ctxt.read_u16be()?);
        let lookup_list_offset = usize::from(ctxt.read_u16be()?);

        let lookup_headers = read_lookup_list(table.offset(lookup_list_offset), type_base)?;
        let mut lookup_names = vec![None; lookup_headers.len()];
        // Feature names carry their index, so only lookups and language systems can collide
        let mut unique_lookup_names = UniqueNames::default();
        let mut unique_language_names = UniqueNames::default();

        let feature_records = read_feature_list(table.offset(feature_list_offset))?;
        let features =
            link_features(feature_records, &mut lookup_names, &mut unique_lookup_names);

        let script_records = read_script_list(table.offset(script_list_offset))?;
        let languages =
            link_languages(&script_records, features.len(), &mut unique_language_names);

        let mut lookups = Vec::with_capacity(lookup_headers.len());
        for (index, (header, name)) in lookup_headers.iter().zip(lookup_names).enumerate() {
            let name = name.unwrap_or_else(|| {
                unique_lookup_names.claim(format!("lookup_{:02x}_{}", header.lookup_type, index))
            });
            let subtables = header.read_subtables()?;
            lookups.push(Lookup {
                name,
                lookup_type: header.lookup_type,
                flags: header.lookup_flag,
                subtables,
            });
        }

        Ok(Table {
            languages,
            features,
            lookups,
        })
    }
}

fn read_lookup_list(
    scope: ReadScope<'_>,
    type_base: LookupTypeBase,
) -> Result<Vec<LookupHeader<'_>>, ParseError> {
    let mut ctxt = scope.ctxt();
    let lookup_count = usize::from(ctxt.read_u16be()?);
    let lookup_offsets = ctxt.read_array::<U16Be>(lookup_count)?;
    lookup_offsets
        .iter()
        .map(|lookup_offset| {
            scope
                .offset(usize::from(lookup_offset))
                .read_dep::<LookupHeader<'_>>(type_base)
        })
        .collect()
}

impl<'b> ReadBinaryDep for LookupHeader<'b> {
    type Args<'a> = LookupTypeBase;
    type HostType<'a> = LookupHeader<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        type_base: LookupTypeBase,
    ) -> Result<LookupHeader<'a>, ParseError> {
        let scope = ctxt.scope();
        let lookup_type = type_base.lookup_type(ctxt.read_u16be()?);
        let lookup_flag = ctxt.read_u16be()?;
        let subtable_count = usize::from(ctxt.read_u16be()?);
        Ok(LookupHeader {
            scope,
            lookup_type,
            lookup_flag,
            subtable_count,
        })
    }
}

impl<'a> LookupHeader<'a> {
    fn read_subtables(&self) -> Result<Vec<Subtable>, ParseError> {
        let mut ctxt = self.scope.offset(LOOKUP_HEADER_SIZE).ctxt();
        let subtable_offsets = ctxt.read_array::<U16Be>(self.subtable_count)?;
        let codec = registry::codec(self.lookup_type);
        Ok(codec.read_subtables(self.scope, &subtable_offsets))
    }
}

fn read_feature_list(scope: ReadScope<'_>) -> Result<Vec<FeatureRecord>, ParseError> {
    let mut ctxt = scope.ctxt();
    let feature_count = usize::from(ctxt.read_u16be()?);
    ctxt.read_array_dep::<FeatureRecord>(feature_count, scope)?
        .read_to_vec()
}

impl ReadBinaryDep for FeatureRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = FeatureRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let feature_tag = ctxt.read_u32be()?;
        let feature_offset = usize::from(ctxt.read_u16be()?);
        let mut feature = scope.offset(feature_offset).ctxt();
        let _feature_params = feature.read_u16be()?;
        let lookup_index_count = usize::from(feature.read_u16be()?);
        let lookup_indices = feature.read_array::<U16Be>(lookup_index_count)?.to_vec();
        Ok(FeatureRecord {
            feature_tag,
            lookup_indices,
        })
    }
}

impl ReadFixedSizeDep for FeatureRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

/// Build features from their records, resolving lookup indices and naming the lookups each
/// feature is the first to refer to.
fn link_features(
    feature_records: Vec<FeatureRecord>,
    lookup_names: &mut [Option<String>],
    names: &mut UniqueNames,
) -> Vec<Feature> {
    let mut features = Vec::with_capacity(feature_records.len());
    for (feature_index, record) in feature_records.into_iter().enumerate() {
        let tag = DisplayTag(record.feature_tag);
        let lookups = record
            .lookup_indices
            .iter()
            .enumerate()
            .map(|(k, &lookup_index)| {
                let lookup_index = usize::from(lookup_index);
                let name = lookup_names.get_mut(lookup_index)?;
                if name.is_none() {
                    *name = Some(names.claim(format!("lookup_{}_{}", tag, k)));
                }
                Some(LookupIndex(lookup_index))
            })
            .collect();
        features.push(Feature {
            name: format!("{}_{}", tag, feature_index),
            lookups,
        });
    }
    features
}

fn read_script_list(scope: ReadScope<'_>) -> Result<Vec<ScriptRecord>, ParseError> {
    let mut ctxt = scope.ctxt();
    let script_count = usize::from(ctxt.read_u16be()?);
    ctxt.read_array_dep::<ScriptRecord>(script_count, scope)?
        .read_to_vec()
}

impl ReadBinaryDep for ScriptRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = ScriptRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let script_tag = ctxt.read_u32be()?;
        let script_offset = usize::from(ctxt.read_u16be()?);
        let script = scope.offset(script_offset);
        let mut ctxt = script.ctxt();
        let default_langsys_offset = usize::from(ctxt.read_u16be()?);
        let langsys_count = usize::from(ctxt.read_u16be()?);
        let langsys_records = ctxt
            .read_array_dep::<LangSysRecord>(langsys_count, script)?
            .read_to_vec()?;
        let opt_default_langsys = if default_langsys_offset != 0 {
            Some(script.offset(default_langsys_offset).read::<LangSys>()?)
        } else {
            None
        };
        Ok(ScriptRecord {
            script_tag,
            opt_default_langsys,
            langsys_records,
        })
    }
}

impl ReadFixedSizeDep for ScriptRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

impl ReadBinaryDep for LangSysRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = LangSysRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let langsys_tag = ctxt.read_u32be()?;
        let langsys_offset = usize::from(ctxt.read_u16be()?);
        let langsys_table = scope.offset(langsys_offset).read::<LangSys>()?;
        Ok(LangSysRecord {
            langsys_tag,
            langsys_table,
        })
    }
}

impl ReadFixedSizeDep for LangSysRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

impl ReadBinary for LangSys {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let _lookup_order = ctxt.read_u16be()?; // reserved, should be zero
        let required_feature_index = ctxt.read_u16be()?;
        let feature_index_count = usize::from(ctxt.read_u16be()?);
        let feature_indices = ctxt.read_array::<U16Be>(feature_index_count)?.to_vec();
        Ok(LangSys {
            required_feature_index,
            feature_indices,
        })
    }
}

impl LangSys {
    fn link(&self, name: String, feature_count: usize) -> LanguageSystem {
        let resolve = |index: u16| {
            let index = usize::from(index);
            (index < feature_count).then_some(FeatureIndex(index))
        };
        LanguageSystem {
            name,
            // 0xFFFF, no required feature, is out of range like any other invalid index
            required_feature: resolve(self.required_feature_index),
            features: self.feature_indices.iter().copied().map(resolve).collect(),
        }
    }
}

/// Flatten scripts into language systems, the default language system of each script first.
fn link_languages(
    script_records: &[ScriptRecord],
    feature_count: usize,
    names: &mut UniqueNames,
) -> Vec<LanguageSystem> {
    let language_count = script_records
        .iter()
        .map(|script| {
            usize::from(script.opt_default_langsys.is_some()) + script.langsys_records.len()
        })
        .sum();

    let mut languages = Vec::with_capacity(language_count);
    for script in script_records {
        let script_tag = DisplayTag(script.script_tag);
        if let Some(langsys) = &script.opt_default_langsys {
            let name = names.claim(format!("{}_DFLT", script_tag));
            languages.push(langsys.link(name, feature_count));
        }
        for record in &script.langsys_records {
            let name = format!("{}_{}", script_tag, DisplayTag(record.langsys_tag));
            let name = names.claim(name);
            languages.push(record.langsys_table.link(name, feature_count));
        }
    }
    languages
}
