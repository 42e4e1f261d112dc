//! # tagsieve-core
//!
//! Tag query and filtering engine for reference-library tags.
//!
//! This crate turns raw tag listings and bibliographic item records into
//! tag-frequency maps, runs them through a configurable filter pipeline
//! (text, boolean query, item metadata, creators, regexes, frequency
//! bounds), and derives tag relationships: co-occurrence, hierarchy and
//! related-tag suggestions. Filter configurations persist as named presets
//! through a host-supplied preference store.

pub mod criteria;
pub mod defaults;
pub mod error;
pub mod export;
pub mod filter;
pub mod frequency;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod preset;
pub mod query;
pub mod relations;

// Re-export commonly used types at crate root
pub use criteria::FilterCriteria;
pub use error::{Error, Result};
pub use export::{to_csv, to_json};
pub use filter::{filter_by_cooccurrence, item_type_group, item_type_groups, FilterEngine, ItemTypeGroup};
pub use frequency::{
    clean, filter_by_frequency, ingest, ingest_from_items, normalize_item_tags, normalize_tag,
    search_any, search_by_substring, statistics, top_n, TagFrequencyMap, TagStatistics,
};
pub use metadata::MetadataIndex;
pub use models::*;
pub use preset::{FilterPreset, MemoryPreferenceStore, PreferenceStore, PresetLibrary};
pub use query::{BoolOperator, MatchMode, QueryExpression};
pub use relations::{
    hierarchy, suggest_filter_combinations, suggest_queries, suggest_related, CooccurrenceMatrix,
    CooccurrenceSource, FilterSuggestion, QuerySuggestion, RelatedTag,
};
