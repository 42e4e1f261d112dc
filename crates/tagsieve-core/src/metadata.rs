//! Metadata index over bibliographic items.
//!
//! Holds the items plus a tag → item-position lookup, and answers the item
//! predicate used by metadata filtering: type, year range, creators,
//! language and collection, each constraining only when set.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::criteria::FilterCriteria;
use crate::models::{BibliographicItem, Tag};

/// Lookups derived from a list of items.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    items: Vec<BibliographicItem>,
    tag_items: HashMap<Tag, Vec<usize>>,
}

impl MetadataIndex {
    /// Index `items`. A tag listed twice on one item is indexed once.
    pub fn build(items: Vec<BibliographicItem>) -> Self {
        let mut tag_items: HashMap<Tag, Vec<usize>> = HashMap::new();
        for (pos, item) in items.iter().enumerate() {
            for tag in &item.tags {
                let positions = tag_items.entry(tag.clone()).or_default();
                if positions.last() != Some(&pos) {
                    positions.push(pos);
                }
            }
        }
        debug!(
            input_count = items.len(),
            result_count = tag_items.len(),
            "Built metadata index"
        );
        Self { items, tag_items }
    }

    pub fn items(&self) -> &[BibliographicItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items carrying `tag` (exact name), in input order.
    pub fn items_with_tag(&self, tag: &str) -> Vec<&BibliographicItem> {
        self.tag_items
            .get(tag)
            .map(|positions| positions.iter().map(|&p| &self.items[p]).collect())
            .unwrap_or_default()
    }

    /// Resolved year of the item at `position`.
    pub fn year_of(&self, position: usize) -> Option<i32> {
        self.items.get(position).and_then(|item| item.year)
    }

    /// Items satisfying every metadata field of `criteria`.
    pub fn matching_items(&self, criteria: &FilterCriteria) -> Vec<&BibliographicItem> {
        self.items
            .iter()
            .filter(|item| matches_criteria(item, criteria))
            .collect()
    }

    /// Union of tags on all items satisfying the non-creator metadata of
    /// `criteria`. Creators constrain tag names in the pipeline, not items.
    pub fn tags_for_matching_items(&self, criteria: &FilterCriteria) -> HashSet<Tag> {
        let matching: Vec<&BibliographicItem> = self
            .items
            .iter()
            .filter(|item| matches_metadata(item, criteria))
            .collect();
        let tags: HashSet<Tag> = matching
            .iter()
            .flat_map(|item| item.tags.iter().cloned())
            .collect();
        debug!(
            matching_items = matching.len(),
            result_count = tags.len(),
            "Collected tags for matching items"
        );
        tags
    }

    /// Distinct item types, sorted.
    pub fn item_types(&self) -> Vec<String> {
        distinct(self.items.iter().map(|i| i.item_type.as_str()))
    }

    /// Distinct languages, sorted.
    pub fn languages(&self) -> Vec<String> {
        distinct(self.items.iter().filter_map(|i| i.language.as_deref()))
    }

    /// Earliest and latest resolved year.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let years = self.items.iter().filter_map(|i| i.year);
        let (min, max) = years.fold((None, None), |(lo, hi): (Option<i32>, Option<i32>), y| {
            (Some(lo.map_or(y, |l| l.min(y))), Some(hi.map_or(y, |h| h.max(y))))
        });
        min.zip(max)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Conjunction of every set metadata field of `criteria`. Unset or empty
/// fields impose nothing; an item lacking a constrained attribute fails.
pub fn matches_criteria(item: &BibliographicItem, criteria: &FilterCriteria) -> bool {
    if let Some(creators) = criteria.creators.as_ref().filter(|c| !c.is_empty()) {
        if !matches_creators(item, creators) {
            return false;
        }
    }
    matches_metadata(item, criteria)
}

/// Like [`matches_criteria`] but ignoring creators: type, year range,
/// language and collection only.
pub fn matches_metadata(item: &BibliographicItem, criteria: &FilterCriteria) -> bool {
    if let Some(types) = criteria.item_types.as_ref().filter(|t| !t.is_empty()) {
        if !types.iter().any(|t| *t == item.item_type) {
            trace!(item_type = %item.item_type, "Item type not allowed");
            return false;
        }
    }

    if criteria.has_year_range() && !matches_year_range(item.year, criteria.start_year, criteria.end_year) {
        return false;
    }

    if let Some(languages) = criteria.languages.as_ref().filter(|l| !l.is_empty()) {
        match &item.language {
            Some(lang) if languages.iter().any(|l| l == lang) => {}
            _ => return false,
        }
    }

    if let Some(collections) = criteria.collections.as_ref().filter(|c| !c.is_empty()) {
        if !item.collections.iter().any(|c| collections.contains(c)) {
            return false;
        }
    }

    true
}

/// Inclusive year check. An item without a year never matches a range.
pub fn matches_year_range(year: Option<i32>, start: Option<i32>, end: Option<i32>) -> bool {
    match year {
        Some(y) => start.map_or(true, |s| y >= s) && end.map_or(true, |e| y <= e),
        None => false,
    }
}

/// True when any filter string is a case-insensitive substring of any
/// creator's "first last" name.
pub fn matches_creators(item: &BibliographicItem, filters: &[String]) -> bool {
    let names: Vec<String> = item
        .creators
        .iter()
        .map(|c| c.display_name().to_lowercase())
        .collect();
    filters.iter().any(|f| {
        let needle = f.to_lowercase();
        names.iter().any(|n| n.contains(&needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Creator;

    fn library() -> Vec<BibliographicItem> {
        vec![
            BibliographicItem::new("journalArticle")
                .with_date("2018-03-01")
                .with_creator(Creator::new("Grace", "Hopper"))
                .with_language("en")
                .in_collection("CS")
                .with_tags(["compilers", "history"]),
            BibliographicItem::new("book")
                .with_date("1999")
                .with_creator(Creator::new("Donald", "Knuth"))
                .with_language("en")
                .with_tags(["algorithms", "history"]),
            BibliographicItem::new("thesis")
                .with_language("de")
                .in_collection("THESES")
                .with_tags(["compilers", "compilers"]),
        ]
    }

    #[test]
    fn test_build_tag_lookup() {
        let index = MetadataIndex::build(library());
        assert_eq!(index.len(), 3);
        assert_eq!(index.items_with_tag("history").len(), 2);
        // duplicate tag on the thesis is indexed once
        assert_eq!(index.items_with_tag("compilers").len(), 2);
        assert!(index.items_with_tag("missing").is_empty());
        assert_eq!(index.year_of(0), Some(2018));
        assert_eq!(index.year_of(2), None);
        assert_eq!(index.year_of(99), None);
    }

    #[test]
    fn test_empty_criteria_matches_all() {
        let index = MetadataIndex::build(library());
        assert_eq!(index.matching_items(&FilterCriteria::new()).len(), 3);
    }

    #[test]
    fn test_item_type_membership() {
        let index = MetadataIndex::build(library());
        let criteria = FilterCriteria::new().item_type("book").item_type("thesis");
        let tags = index.tags_for_matching_items(&criteria);
        assert!(tags.contains("algorithms"));
        assert!(tags.contains("compilers"));
        assert!(!tags.is_empty());
        assert_eq!(index.matching_items(&criteria).len(), 2);
    }

    #[test]
    fn test_year_range_open_ends() {
        assert!(matches_year_range(Some(2000), Some(2000), None));
        assert!(matches_year_range(Some(2000), None, Some(2000)));
        assert!(!matches_year_range(Some(1999), Some(2000), None));
        assert!(!matches_year_range(None, None, Some(2020)));
    }

    #[test]
    fn test_year_range_excludes_undated() {
        let index = MetadataIndex::build(library());
        let criteria = FilterCriteria::new().years(Some(1990), Some(2020));
        assert_eq!(index.matching_items(&criteria).len(), 2);
    }

    #[test]
    fn test_creator_substring_or() {
        let item = &library()[0];
        assert!(matches_creators(item, &["hopper".to_string()]));
        assert!(matches_creators(item, &["nobody".to_string(), "grace h".to_string()]));
        assert!(!matches_creators(item, &["knuth".to_string()]));
    }

    #[test]
    fn test_language_and_collection() {
        let index = MetadataIndex::build(library());
        let de = FilterCriteria::new().language("de");
        assert_eq!(index.matching_items(&de).len(), 1);

        let cs = FilterCriteria::new().collection("CS").collection("THESES");
        assert_eq!(index.matching_items(&cs).len(), 2);
    }

    #[test]
    fn test_conjunction_can_be_empty() {
        let index = MetadataIndex::build(library());
        let criteria = FilterCriteria::new().item_type("book").language("de");
        assert!(index.tags_for_matching_items(&criteria).is_empty());
    }

    #[test]
    fn test_creators_do_not_narrow_matching_tags() {
        let index = MetadataIndex::build(library());
        let criteria = FilterCriteria::new().item_type("book").creator("hopper");
        // the book is by Knuth; creators only apply at item level
        assert!(index.tags_for_matching_items(&criteria).contains("algorithms"));
        assert!(index.matching_items(&criteria).is_empty());
        assert!(!matches_criteria(&library()[1], &criteria));
        assert!(matches_metadata(&library()[1], &criteria));
    }

    #[test]
    fn test_distinct_values() {
        let index = MetadataIndex::build(library());
        assert_eq!(index.item_types(), vec!["book", "journalArticle", "thesis"]);
        assert_eq!(index.languages(), vec!["de", "en"]);
        assert_eq!(index.year_span(), Some((1999, 2018)));
        assert_eq!(MetadataIndex::default().year_span(), None);
    }
}
