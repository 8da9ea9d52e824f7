//! Conversion of the layout graph to and from name keyed JSON documents.
//!
//! A document has three objects, `languages`, `features` and `lookups`, keyed by name.
//! Language systems refer to features, and features refer to lookups, by those names.
//!
//! ```json
//! {
//!   "languages": { "latn_DFLT": { "features": ["smcp_0"] } },
//!   "features": { "smcp_0": ["lookup_smcp_0"] },
//!   "lookups": {
//!     "lookup_smcp_0": {
//!       "type": "gsub_single",
//!       "subtables": [{ "from": ["a"], "to": ["a.sc"] }]
//!     }
//!   }
//! }
//! ```

use std::fmt;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DocumentError, LayoutError};
use crate::layout::{Feature, FeatureIndex, LanguageSystem, Lookup, LookupIndex, Table};
use crate::registry;

const LANGUAGES: &str = "languages";
const FEATURES: &str = "features";
const LOOKUPS: &str = "lookups";

/// A layout document parsed from JSON text.
///
/// `serde_json::Value` keeps only the last of several object members with the same name. The
/// collections of a `LayoutDocument` keep every member in document order, so that the first of
/// several entries with the same name is the one that ends up in the table.
#[derive(Debug, Deserialize)]
pub struct LayoutDocument {
    languages: Option<Entries>,
    features: Option<Entries>,
    lookups: Option<Entries>,
}

/// The members of a JSON object, in document order, duplicates included.
#[derive(Debug, Default)]
struct Entries(Vec<(String, Value)>);

struct EntriesVisitor;

type Members<'a> = Vec<(&'a str, &'a Value)>;

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = Entries;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Entries, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, Value>()? {
            entries.push((name, value));
        }
        Ok(Entries(entries))
    }
}

impl Entries {
    fn members(&self) -> Members<'_> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }
}

impl LayoutDocument {
    pub fn from_json_str(text: &str) -> Result<LayoutDocument, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the table described by this document.
    pub fn to_table(&self) -> Result<Table, LayoutError> {
        let languages = collection(self.languages.as_ref(), LANGUAGES)?;
        let features = collection(self.features.as_ref(), FEATURES)?;
        let lookups = collection(self.lookups.as_ref(), LOOKUPS)?;
        Ok(reconstruct(&languages, &features, &lookups))
    }
}

fn collection<'a>(
    entries: Option<&'a Entries>,
    name: &'static str,
) -> Result<Members<'a>, DocumentError> {
    entries
        .map(Entries::members)
        .ok_or(DocumentError::MissingCollection(name))
}

fn object_members<'a>(document: &'a Value, name: &'static str) -> Result<Members<'a>, DocumentError> {
    document
        .get(name)
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .map(|(name, value)| (name.as_str(), value))
                .collect()
        })
        .ok_or(DocumentError::MissingCollection(name))
}

impl Table {
    /// Describe this table as a document.
    ///
    /// Glyphs are written by name, so `name_glyphs` should be called first.
    pub fn to_document(&self) -> Value {
        let mut languages = Map::new();
        for language in &self.languages {
            let mut node = Map::new();
            if let Some(feature) = language
                .required_feature
                .and_then(|index| self.feature(index))
            {
                node.insert("requiredFeature".to_string(), Value::from(feature.name.as_str()));
            }
            let features = self
                .language_features(language)
                .map(|feature| Value::from(feature.name.as_str()))
                .collect();
            node.insert(FEATURES.to_string(), Value::Array(features));
            languages.insert(language.name.clone(), Value::Object(node));
        }

        let mut features = Map::new();
        for feature in &self.features {
            let lookups = self
                .feature_lookups(feature)
                .map(|lookup| Value::from(lookup.name.as_str()))
                .collect();
            features.insert(feature.name.clone(), Value::Array(lookups));
        }

        let mut lookups = Map::new();
        for lookup in &self.lookups {
            let mut node = Map::new();
            registry::codec(lookup.lookup_type).to_document(lookup, &mut node);
            lookups.insert(lookup.name.clone(), Value::Object(node));
        }

        let mut document = Map::new();
        document.insert(LANGUAGES.to_string(), Value::Object(languages));
        document.insert(FEATURES.to_string(), Value::Object(features));
        document.insert(LOOKUPS.to_string(), Value::Object(lookups));
        Value::Object(document)
    }

    /// Add the document of this table to a font level document under `table_tag`.
    pub fn insert_into(&self, root: &mut Map<String, Value>, table_tag: &str) {
        root.insert(table_tag.to_string(), self.to_document());
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_document())
    }

    /// Build a table from a document.
    ///
    /// Entries that cannot be used are skipped: lookups of unsupported types, names that do not
    /// resolve, features without lookups and language systems without features. Glyph ids are
    /// left unresolved, call `resolve_glyph_ids` to fill them in.
    pub fn from_document(document: &Value) -> Result<Table, LayoutError> {
        let languages = object_members(document, LANGUAGES)?;
        let features = object_members(document, FEATURES)?;
        let lookups = object_members(document, LOOKUPS)?;
        Ok(reconstruct(&languages, &features, &lookups))
    }

    /// Build a table from the document stored under `table_tag` in a font level document.
    pub fn from_font_document(root: &Value, table_tag: &str) -> Result<Table, LayoutError> {
        match root.get(table_tag) {
            Some(document) if document.is_object() => Table::from_document(document),
            _ => Err(DocumentError::MissingTable(table_tag.to_string()).into()),
        }
    }

    /// Build a table from JSON text. Of several entries with the same name, the first is used.
    pub fn from_json_str(text: &str) -> Result<Table, LayoutError> {
        LayoutDocument::from_json_str(text)?.to_table()
    }
}

fn reconstruct(
    language_members: &[(&str, &Value)],
    feature_members: &[(&str, &Value)],
    lookup_members: &[(&str, &Value)],
) -> Table {
    let lookups = reconstruct_lookups(lookup_members);
    let features = reconstruct_features(feature_members, &lookups);
    let languages = reconstruct_languages(language_members, &features);

    Table {
        languages: languages.into_values().collect(),
        features: features
            .into_iter()
            .map(|(name, lookups)| Feature {
                name: name.to_string(),
                lookups,
            })
            .collect(),
        lookups: lookups.into_values().collect(),
    }
}

fn reconstruct_lookups<'a>(members: &[(&'a str, &Value)]) -> IndexMap<&'a str, Lookup> {
    let mut lookups = IndexMap::with_capacity(members.len());
    for &(name, node) in members {
        if lookups.contains_key(name) {
            warn!("skipping duplicate lookup '{}'", name);
            continue;
        }
        let Some(node) = node.as_object() else {
            warn!("skipping lookup '{}': not an object", name);
            continue;
        };
        let Some(type_name) = node.get("type").and_then(Value::as_str) else {
            warn!("skipping lookup '{}': no type", name);
            continue;
        };
        let Some((lookup_type, codec)) = registry::codec_by_name(type_name) else {
            warn!("skipping lookup '{}' of unsupported type '{}'", name, type_name);
            continue;
        };
        match codec.from_document(node) {
            Some(body) => {
                lookups.insert(
                    name,
                    Lookup {
                        name: name.to_string(),
                        lookup_type,
                        flags: body.flags,
                        subtables: body.subtables,
                    },
                );
            }
            None => warn!("skipping invalid lookup '{}'", name),
        }
    }
    lookups
}

fn reconstruct_features<'a>(
    members: &[(&'a str, &Value)],
    lookups: &IndexMap<&str, Lookup>,
) -> IndexMap<&'a str, Vec<Option<LookupIndex>>> {
    let mut features = IndexMap::with_capacity(members.len());
    for &(name, node) in members {
        let lookup_indices = resolve_names(Some(node), lookups, "lookup");
        if lookup_indices.is_empty() {
            debug!("dropping feature '{}' without lookups", name);
            continue;
        }
        if features.contains_key(name) {
            warn!("skipping duplicate feature '{}'", name);
            continue;
        }
        let lookup_indices = lookup_indices
            .into_iter()
            .map(|index| Some(LookupIndex(index)))
            .collect();
        features.insert(name, lookup_indices);
    }
    features
}

fn reconstruct_languages<'a, T>(
    members: &[(&'a str, &Value)],
    features: &IndexMap<&str, T>,
) -> IndexMap<&'a str, LanguageSystem> {
    let mut languages = IndexMap::with_capacity(members.len());
    for &(name, node) in members {
        let Some(node) = node.as_object() else {
            warn!("skipping language system '{}': not an object", name);
            continue;
        };
        let required_feature = node
            .get("requiredFeature")
            .and_then(Value::as_str)
            .and_then(|feature_name| {
                let index = features.get_index_of(feature_name);
                if index.is_none() {
                    warn!("unresolved feature name '{}'", feature_name);
                }
                index
            })
            .map(FeatureIndex);
        let feature_indices = resolve_names(node.get(FEATURES), features, "feature");
        if required_feature.is_none() && feature_indices.is_empty() {
            debug!("dropping language system '{}' without features", name);
            continue;
        }
        if languages.contains_key(name) {
            warn!("skipping duplicate language system '{}'", name);
            continue;
        }
        languages.insert(
            name,
            LanguageSystem {
                name: name.to_string(),
                required_feature,
                features: feature_indices
                    .into_iter()
                    .map(|index| Some(FeatureIndex(index)))
                    .collect(),
            },
        );
    }
    languages
}

/// Indices in `known` of the names in the array `node`. Names that are not known are skipped.
fn resolve_names<T>(node: Option<&Value>, known: &IndexMap<&str, T>, kind: &str) -> Vec<usize> {
    node.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let name = item.as_str()?;
            let index = known.get_index_of(name);
            if index.is_none() {
                warn!("unresolved {} name '{}'", kind, name);
            }
            index
        })
        .collect()
}
