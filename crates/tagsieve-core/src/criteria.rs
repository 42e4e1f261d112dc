//! Filter criteria for the tag filter pipeline.
//!
//! Every field defaults to "no constraint". Criteria are plain data: build
//! them with the builder methods, hand them to a
//! [`FilterEngine`](crate::filter::FilterEngine), or persist them inside a
//! [`FilterPreset`](crate::preset::FilterPreset).
//!
//! # Example
//!
//! ```
//! use tagsieve_core::FilterCriteria;
//!
//! // Journal articles from 2015-2020 tagged with something "learning",
//! // excluding anything that looks like a draft
//! let criteria = FilterCriteria::new()
//!     .search("learning")
//!     .item_type("journalArticle")
//!     .years(Some(2015), Some(2020))
//!     .exclude_pattern("(?i)draft")
//!     .min_frequency(2);
//!
//! assert!(criteria.has_metadata_constraints());
//! assert!(!criteria.is_empty());
//! ```

use serde::{Deserialize, Serialize};

/// Immutable configuration for one filter pass.
///
/// Serialized field names are stable; presets written by one version must
/// load in the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Substrings OR-matched against tag names. Ignored when
    /// `boolean_query` is set.
    #[serde(default)]
    pub search_terms: Option<Vec<String>>,

    /// Boolean query evaluated per tag; supersedes `search_terms`.
    #[serde(default)]
    pub boolean_query: Option<String>,

    /// Allowed item types (exact match).
    #[serde(default)]
    pub item_types: Option<Vec<String>>,

    /// Inclusive lower year bound.
    #[serde(default)]
    pub start_year: Option<i32>,

    /// Inclusive upper year bound.
    #[serde(default)]
    pub end_year: Option<i32>,

    /// Creator-name substrings, OR-matched against "first last".
    #[serde(default)]
    pub creators: Option<Vec<String>>,

    /// Allowed language codes.
    #[serde(default)]
    pub languages: Option<Vec<String>>,

    /// Allowed collection identifiers.
    #[serde(default)]
    pub collections: Option<Vec<String>>,

    /// Inclusive lower frequency bound (1 when unset).
    #[serde(default)]
    pub min_frequency: Option<u64>,

    /// Inclusive upper frequency bound.
    #[serde(default)]
    pub max_frequency: Option<u64>,

    /// Tags must match this regex (case-insensitive).
    #[serde(default)]
    pub regex_pattern: Option<String>,

    /// Tags matching ANY of these regexes are dropped (case-insensitive).
    #[serde(default)]
    pub exclude_patterns: Option<Vec<String>>,

    /// Keep at most this many tags, most frequent first.
    #[serde(default)]
    pub max_tags: Option<usize>,
}

fn push(list: &mut Option<Vec<String>>, value: impl Into<String>) {
    list.get_or_insert_with(Vec::new).push(value.into());
}

fn non_empty<T>(list: &Option<Vec<T>>) -> bool {
    list.as_ref().map(|l| !l.is_empty()).unwrap_or(false)
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_ref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl FilterCriteria {
    /// Create empty criteria (matches everything with frequency >= 1).
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // BUILDER METHODS
    // =========================================================================

    /// Add a search term (OR logic with other terms).
    pub fn search(mut self, term: impl Into<String>) -> Self {
        push(&mut self.search_terms, term);
        self
    }

    /// Set the boolean query.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.boolean_query = Some(query.into());
        self
    }

    /// Allow an item type.
    pub fn item_type(mut self, item_type: impl Into<String>) -> Self {
        push(&mut self.item_types, item_type);
        self
    }

    /// Set the inclusive year range; either end may be open.
    pub fn years(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    /// Add a creator-name substring.
    pub fn creator(mut self, name: impl Into<String>) -> Self {
        push(&mut self.creators, name);
        self
    }

    /// Allow a language code.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        push(&mut self.languages, language);
        self
    }

    /// Allow a collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        push(&mut self.collections, collection);
        self
    }

    pub fn min_frequency(mut self, min: u64) -> Self {
        self.min_frequency = Some(min);
        self
    }

    pub fn max_frequency(mut self, max: u64) -> Self {
        self.max_frequency = Some(max);
        self
    }

    /// Set the include regex.
    pub fn include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.regex_pattern = Some(pattern.into());
        self
    }

    /// Add an exclude regex.
    pub fn exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        push(&mut self.exclude_patterns, pattern);
        self
    }

    pub fn max_tags(mut self, n: usize) -> Self {
        self.max_tags = Some(n);
        self
    }

    // =========================================================================
    // CONSTRAINT CHECKS
    // =========================================================================

    /// Check if no field constrains anything.
    pub fn is_empty(&self) -> bool {
        !self.has_text_constraints()
            && !self.has_metadata_constraints()
            && !self.has_creator_constraints()
            && !self.has_pattern_constraints()
            && self.min_frequency.is_none()
            && self.max_frequency.is_none()
            && self.max_tags.is_none()
    }

    /// Check if a non-blank boolean query is set.
    pub fn has_boolean_query(&self) -> bool {
        non_blank(&self.boolean_query)
    }

    /// Check if search terms or a boolean query are set.
    pub fn has_text_constraints(&self) -> bool {
        self.has_boolean_query() || non_empty(&self.search_terms)
    }

    /// Check if any item-metadata field is set (types, languages, years,
    /// collections).
    pub fn has_metadata_constraints(&self) -> bool {
        non_empty(&self.item_types)
            || non_empty(&self.languages)
            || non_empty(&self.collections)
            || self.start_year.is_some()
            || self.end_year.is_some()
    }

    /// Check if creator substrings are set.
    pub fn has_creator_constraints(&self) -> bool {
        non_empty(&self.creators)
    }

    /// Check if include or exclude regexes are set.
    pub fn has_pattern_constraints(&self) -> bool {
        non_blank(&self.regex_pattern) || non_empty(&self.exclude_patterns)
    }

    /// Check if a year bound is set.
    pub fn has_year_range(&self) -> bool {
        self.start_year.is_some() || self.end_year.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_criteria() {
        let criteria = FilterCriteria::new();
        assert!(criteria.is_empty());
        assert!(!criteria.has_metadata_constraints());
        assert!(!criteria.has_text_constraints());
    }

    #[test]
    fn test_builder_accumulates_lists() {
        let criteria = FilterCriteria::new()
            .search("python")
            .search("rust")
            .exclude_pattern("^tmp")
            .exclude_pattern("draft");

        assert_eq!(criteria.search_terms.as_ref().unwrap().len(), 2);
        assert_eq!(criteria.exclude_patterns.as_ref().unwrap().len(), 2);
        assert!(criteria.has_pattern_constraints());
    }

    #[test]
    fn test_metadata_detection() {
        assert!(FilterCriteria::new().item_type("book").has_metadata_constraints());
        assert!(FilterCriteria::new().language("en").has_metadata_constraints());
        assert!(FilterCriteria::new().collection("C1").has_metadata_constraints());
        assert!(FilterCriteria::new().years(None, Some(2000)).has_metadata_constraints());
        // creators filter tag names, not the item predicate trigger
        assert!(!FilterCriteria::new().creator("smith").has_metadata_constraints());
    }

    #[test]
    fn test_empty_lists_do_not_constrain() {
        let criteria = FilterCriteria {
            item_types: Some(Vec::new()),
            search_terms: Some(Vec::new()),
            boolean_query: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_deserialize_missing_fields_default_to_none() {
        let criteria: FilterCriteria = serde_json::from_str(r#"{"min_frequency": 3}"#).unwrap();
        assert_eq!(criteria.min_frequency, Some(3));
        assert!(criteria.search_terms.is_none());
        assert!(criteria.max_tags.is_none());
    }

    #[test]
    fn test_serialize_keeps_null_fields() {
        let json = serde_json::to_value(FilterCriteria::new()).unwrap();
        assert!(json.get("search_terms").unwrap().is_null());
        assert!(json.get("exclude_patterns").unwrap().is_null());
    }
}
