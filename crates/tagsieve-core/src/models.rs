//! Data model for tags and bibliographic items.
//!
//! Two shapes arrive from a tag source: `{tag, meta: {numItems}}` records or
//! bare strings. Items carry their tags as `{tag}` objects or bare strings.
//! Both are resolved once, at ingestion, into uniform owned types so the rest
//! of the engine never inspects raw JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::defaults::YEAR_PATTERN;
use crate::error::{Error, Result};

/// A tag label. Case is preserved for display; matching is case-insensitive.
pub type Tag = String;

static YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(YEAR_PATTERN).expect("year pattern is a valid regex"));

// =============================================================================
// WIRE SHAPES
// =============================================================================

/// A tag reference as it appears on an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    /// `{"tag": "python", "type": 1}`
    Labeled { tag: String },
    /// `"python"`
    Named(String),
}

impl TagRef {
    /// The tag label regardless of shape.
    pub fn name(&self) -> &str {
        match self {
            Self::Labeled { tag } => tag,
            Self::Named(name) => name,
        }
    }
}

/// Per-tag metadata reported by the library API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMeta {
    #[serde(rename = "numItems", default, skip_serializing_if = "Option::is_none")]
    pub num_items: Option<u64>,
}

/// One entry from a tag source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTag {
    /// `{"tag": "python", "meta": {"numItems": 8}}`
    Record {
        tag: String,
        #[serde(default)]
        meta: Option<TagMeta>,
    },
    /// `"python"`, counted as frequency 1.
    Name(String),
}

impl RawTag {
    /// The tag label regardless of shape.
    pub fn name(&self) -> &str {
        match self {
            Self::Record { tag, .. } => tag,
            Self::Name(name) => name,
        }
    }

    /// Reported frequency; 1 when the source gives none.
    pub fn count(&self) -> u64 {
        match self {
            Self::Record { meta, .. } => meta.as_ref().and_then(|m| m.num_items).unwrap_or(1),
            Self::Name(_) => 1,
        }
    }
}

/// A creator (author, editor, ...) of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Single-field name used for institutional creators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            name: None,
        }
    }

    /// "first last", trimmed; falls back to the single-field name.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.name.clone().unwrap_or_default()
        } else {
            full.to_string()
        }
    }
}

/// The `data` object of a library item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// A library item envelope: `{"key": "...", "data": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub data: Option<ItemData>,
}

// =============================================================================
// RESOLVED ITEM
// =============================================================================

/// A bibliographic item with its year and tag labels resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographicItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// First 19xx/20xx year found in `date`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl BibliographicItem {
    /// Create an item of the given type with no metadata.
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            ..Default::default()
        }
    }

    /// Set the date string, resolving the year from it.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        let date = date.into();
        self.year = extract_year(&date);
        self.date = Some(date);
        self
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators.push(creator);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collections.push(collection.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Resolve a wire record. Records without a `data` object yield `None`.
    pub fn from_record(record: ItemRecord) -> Option<Self> {
        let data = record.data?;
        let year = data.date.as_deref().and_then(extract_year);
        let tags = data
            .tags
            .iter()
            .map(TagRef::name)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            key: record.key,
            item_type: data.item_type,
            date: data.date,
            year,
            creators: data.creators,
            language: data.language,
            collections: data.collections,
            tags,
        })
    }
}

/// Extract the first 4-digit year in 1900..=2099 from a free-text date.
pub fn extract_year(date: &str) -> Option<i32> {
    YEAR_REGEX
        .find(date)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

// =============================================================================
// BOUNDARY PARSING
// =============================================================================

/// Parse a tag source. The value must be a JSON array.
pub fn parse_tag_source(value: &JsonValue) -> Result<Vec<RawTag>> {
    let entries = value
        .as_array()
        .ok_or_else(|| Error::InvalidInput("tag source must be a list".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            RawTag::deserialize(entry).map_err(|e| {
                Error::InvalidInput(format!("tag entry {} is neither a record nor a string: {}", i, e))
            })
        })
        .collect()
}

/// Parse an item source into resolved items. The value must be a JSON array
/// of objects; objects without `data` are skipped.
pub fn parse_items(value: &JsonValue) -> Result<Vec<BibliographicItem>> {
    let entries = value
        .as_array()
        .ok_or_else(|| Error::InvalidInput("item source must be a list".to_string()))?;

    let mut items = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            return Err(Error::InvalidInput(format!("item {} is not an object", i)));
        }
        let record = ItemRecord::deserialize(entry)
            .map_err(|e| Error::InvalidInput(format!("item {}: {}", i, e)))?;
        match BibliographicItem::from_record(record) {
            Some(item) => items.push(item),
            None => debug!(index = i, "Skipping item without data"),
        }
    }
    Ok(items)
}
