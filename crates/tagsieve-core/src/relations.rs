//! Tag relationships: co-occurrence, hierarchical namespaces and
//! suggestions built on them.
//!
//! Co-occurrence has two sources and the caller picks one explicitly:
//! real counts from item tag lists, or a word-overlap estimate when only a
//! frequency map is available. The two are never mixed.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::criteria::FilterCriteria;
use crate::defaults::{
    ACADEMIC_ITEM_TYPES, FILTER_SUGGESTION_LIMIT, HIGHLY_CONNECTED_MIN_PARTNERS,
};
use crate::frequency::TagFrequencyMap;
use crate::models::{BibliographicItem, Tag};

// =============================================================================
// CO-OCCURRENCE
// =============================================================================

/// Where co-occurrence counts come from.
#[derive(Debug, Clone, Copy)]
pub enum CooccurrenceSource<'a> {
    /// Count items on which both tags appear.
    Items(&'a [BibliographicItem]),
    /// Estimate from shared words: `min(freq_a, freq_b)` for tags sharing a
    /// lowercase word. Used when item data is unavailable.
    WordOverlap(&'a TagFrequencyMap),
}

/// Symmetric tag → partner → count matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooccurrenceMatrix {
    counts: BTreeMap<Tag, BTreeMap<Tag, u64>>,
}

impl CooccurrenceMatrix {
    /// Build from the chosen source, dropping pairs below `min_count`.
    pub fn build(source: CooccurrenceSource<'_>, min_count: u64) -> Self {
        match source {
            CooccurrenceSource::Items(items) => Self::from_items(items, min_count),
            CooccurrenceSource::WordOverlap(tags) => Self::from_word_overlap(tags, min_count),
        }
    }

    /// Count, for every unordered pair of distinct tags on an item, one
    /// co-occurrence in each direction.
    pub fn from_items(items: &[BibliographicItem], min_count: u64) -> Self {
        let mut matrix = Self::default();
        for item in items {
            let distinct: Vec<&str> = item
                .tags
                .iter()
                .map(String::as_str)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for (i, a) in distinct.iter().enumerate() {
                for b in &distinct[i + 1..] {
                    matrix.add_pair(a, b, 1);
                }
            }
        }
        matrix.prune(min_count);
        debug!(
            input_count = items.len(),
            result_count = matrix.len(),
            source = "items",
            "Built co-occurrence matrix"
        );
        matrix
    }

    /// Heuristic fallback: tags sharing a word co-occur `min(freq_a, freq_b)`
    /// times.
    pub fn from_word_overlap(tags: &TagFrequencyMap, min_count: u64) -> Self {
        let entries: Vec<(&str, u64, HashSet<String>)> =
            tags.iter().map(|(t, c)| (t, c, words(t))).collect();

        let mut matrix = Self::default();
        for (i, (a, freq_a, words_a)) in entries.iter().enumerate() {
            for (b, freq_b, words_b) in &entries[i + 1..] {
                if a != b && !words_a.is_disjoint(words_b) {
                    matrix.add_pair(a, b, (*freq_a).min(*freq_b));
                }
            }
        }
        matrix.prune(min_count);
        debug!(
            input_count = tags.len(),
            result_count = matrix.len(),
            source = "word_overlap",
            "Built co-occurrence matrix"
        );
        matrix
    }

    fn add_pair(&mut self, a: &str, b: &str, by: u64) {
        *self
            .counts
            .entry(a.to_string())
            .or_default()
            .entry(b.to_string())
            .or_insert(0) += by;
        *self
            .counts
            .entry(b.to_string())
            .or_default()
            .entry(a.to_string())
            .or_insert(0) += by;
    }

    /// Drop counts below `min_count`, then tags left without partners.
    fn prune(&mut self, min_count: u64) {
        for partners in self.counts.values_mut() {
            partners.retain(|_, count| *count >= min_count);
        }
        self.counts.retain(|_, partners| !partners.is_empty());
    }

    /// Co-occurrence count of `a` with `b` (0 when absent).
    pub fn get(&self, a: &str, b: &str) -> u64 {
        self.counts
            .get(a)
            .and_then(|p| p.get(b))
            .copied()
            .unwrap_or(0)
    }

    /// Partners of `tag`, if it has any.
    pub fn partners(&self, tag: &str) -> Option<&BTreeMap<Tag, u64>> {
        self.counts.get(tag)
    }

    /// Number of tags with at least one partner.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &BTreeMap<Tag, u64>)> {
        self.counts.iter()
    }
}

/// Lowercase words of a tag, split on whitespace and common separators.
fn words(tag: &str) -> HashSet<String> {
    tag.to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '/' | ':' | ','))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn word_overlap(a: &str, b: &str) -> usize {
    words(a).intersection(&words(b)).count()
}

// =============================================================================
// HIERARCHY
// =============================================================================

/// Parent path → child paths for delimiter-namespaced tags.
///
/// `"Research-Methods-Quantitative"` yields `"Research"` →
/// `"Research-Methods"` and `"Research-Methods"` →
/// `"Research-Methods-Quantitative"`. Tags without the separator contribute
/// nothing. Children are unique and keep first-seen order.
pub fn hierarchy<S: AsRef<str>>(tags: &[S], separator: &str) -> BTreeMap<String, Vec<String>> {
    let mut tree: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if separator.is_empty() {
        return tree;
    }

    for tag in tags {
        let parts: Vec<&str> = tag.as_ref().split(separator).collect();
        for depth in 1..parts.len() {
            let parent = parts[..depth].join(separator);
            let child = parts[..=depth].join(separator);
            let children = tree.entry(parent).or_default();
            if !children.contains(&child) {
                children.push(child);
            }
        }
    }
    tree
}

// =============================================================================
// SUGGESTIONS
// =============================================================================

/// A tag related to a target, with the values it was ranked by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTag {
    pub tag: Tag,
    /// Words shared with the target.
    pub word_overlap: usize,
    /// Frequency of the tag (0 when absent from the frequency map).
    pub frequency: u64,
    /// Co-occurrence count with the target.
    pub cooccurrence: u64,
}

/// Partners of `target` ranked by (word overlap, frequency) descending.
/// Ties keep tag-name order.
pub fn suggest_related(
    target: &str,
    matrix: &CooccurrenceMatrix,
    frequencies: &TagFrequencyMap,
) -> Vec<RelatedTag> {
    let Some(partners) = matrix.partners(target) else {
        return Vec::new();
    };

    let mut related: Vec<RelatedTag> = partners
        .iter()
        .map(|(tag, &count)| RelatedTag {
            tag: tag.clone(),
            word_overlap: word_overlap(target, tag),
            frequency: frequencies.count(tag),
            cooccurrence: count,
        })
        .collect();
    related.sort_by(|a, b| {
        b.word_overlap
            .cmp(&a.word_overlap)
            .then(b.frequency.cmp(&a.frequency))
    });
    related
}

/// A ready-to-run boolean query proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySuggestion {
    pub label: String,
    pub query: String,
}

/// `AND` / `OR` / `NOT` queries combining `target` with its top related tag.
pub fn suggest_queries(target: &str, related: &[RelatedTag]) -> Vec<QuerySuggestion> {
    let Some(top) = related.first() else {
        return Vec::new();
    };
    let a = quote(target);
    let b = quote(&top.tag);
    vec![
        QuerySuggestion {
            label: format!("Both {} and {}", target, top.tag),
            query: format!("{} AND {}", a, b),
        },
        QuerySuggestion {
            label: format!("Either {} or {}", target, top.tag),
            query: format!("{} OR {}", a, b),
        },
        QuerySuggestion {
            label: format!("{} without {}", target, top.tag),
            query: format!("{} NOT {}", a, b),
        },
    ]
}

fn quote(term: &str) -> String {
    format!("\"{}\"", term.replace('"', ""))
}

/// A suggested filter with an estimate of how much it would match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSuggestion {
    pub name: String,
    pub description: String,
    pub criteria: FilterCriteria,
    pub estimated_items: u64,
}

/// Filters worth trying: "Related to" each highly connected tag (most
/// partners first), plus academic publication types.
pub fn suggest_filter_combinations(
    tags: &TagFrequencyMap,
    matrix: &CooccurrenceMatrix,
) -> Vec<FilterSuggestion> {
    let mut connected: Vec<(&Tag, usize)> = matrix
        .iter()
        .map(|(tag, partners)| (tag, partners.len()))
        .filter(|(_, n)| *n >= HIGHLY_CONNECTED_MIN_PARTNERS)
        .collect();
    connected.sort_by(|a, b| b.1.cmp(&a.1));

    let mut suggestions: Vec<FilterSuggestion> = connected
        .into_iter()
        .take(FILTER_SUGGESTION_LIMIT)
        .map(|(tag, _)| FilterSuggestion {
            name: format!("Related to \"{}\"", tag),
            description: format!("Items tagged with \"{}\" and related concepts", tag),
            criteria: FilterCriteria::new().search(tag.clone()),
            estimated_items: tags.count(tag),
        })
        .collect();

    let academic = ACADEMIC_ITEM_TYPES
        .iter()
        .fold(FilterCriteria::new(), |c, t| c.item_type(*t));
    suggestions.push(FilterSuggestion {
        name: "Academic Publications".to_string(),
        description: "Journal articles, books, and conference papers".to_string(),
        criteria: academic,
        estimated_items: ACADEMIC_ITEM_TYPES.iter().map(|t| tags.count(t)).sum(),
    });
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(tag_lists: &[&[&str]]) -> Vec<BibliographicItem> {
        tag_lists
            .iter()
            .map(|tags| BibliographicItem::new("book").with_tags(tags.iter().copied()))
            .collect()
    }

    #[test]
    fn test_cooccurrence_scenario() {
        let matrix = CooccurrenceMatrix::from_items(&items(&[&["a", "b"], &["b", "c"]]), 1);
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.get("a", "b"), 1);
        assert_eq!(matrix.get("b", "a"), 1);
        assert_eq!(matrix.get("b", "c"), 1);
        assert_eq!(matrix.get("c", "b"), 1);
        assert_eq!(matrix.get("a", "c"), 0);
        assert_eq!(matrix.partners("b").unwrap().len(), 2);
    }

    #[test]
    fn test_cooccurrence_prunes_and_omits_lonely_tags() {
        let matrix = CooccurrenceMatrix::from_items(
            &items(&[&["a", "b"], &["a", "b"], &["a", "c"]]),
            2,
        );
        assert_eq!(matrix.get("a", "b"), 2);
        assert!(matrix.partners("c").is_none());
        assert_eq!(matrix.partners("a").unwrap().len(), 1);
    }

    #[test]
    fn test_cooccurrence_ignores_duplicate_tags_on_item() {
        let matrix = CooccurrenceMatrix::from_items(&items(&[&["a", "a", "b"]]), 1);
        assert_eq!(matrix.get("a", "b"), 1);
        assert_eq!(matrix.get("a", "a"), 0);
    }

    #[test]
    fn test_word_overlap_fallback() {
        let tags: TagFrequencyMap = [("machine learning", 5), ("deep learning", 2), ("python", 8)]
            .into_iter()
            .collect();
        let matrix = CooccurrenceMatrix::build(CooccurrenceSource::WordOverlap(&tags), 1);
        assert_eq!(matrix.get("machine learning", "deep learning"), 2);
        assert_eq!(matrix.get("deep learning", "machine learning"), 2);
        assert!(matrix.partners("python").is_none());
    }

    #[test]
    fn test_build_dispatches_items() {
        let data = items(&[&["x", "y"]]);
        let matrix = CooccurrenceMatrix::build(CooccurrenceSource::Items(&data), 1);
        assert_eq!(matrix.get("x", "y"), 1);
    }

    #[test]
    fn test_hierarchy_scenario() {
        let tree = hierarchy(&["Research-Methods-Quantitative"], "-");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree["Research"], vec!["Research-Methods"]);
        assert_eq!(tree["Research-Methods"], vec!["Research-Methods-Quantitative"]);
    }

    #[test]
    fn test_hierarchy_merges_and_skips_flat() {
        let tree = hierarchy(
            &["Research-Methods", "Research-Ethics", "Research-Methods", "flat"],
            "-",
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["Research"], vec!["Research-Methods", "Research-Ethics"]);
    }

    #[test]
    fn test_hierarchy_custom_separator() {
        let tree = hierarchy(&["ai/ml"], "/");
        assert_eq!(tree["ai"], vec!["ai/ml"]);
        assert!(hierarchy(&["ai/ml"], "").is_empty());
    }

    #[test]
    fn test_suggest_related_ranking() {
        let matrix = CooccurrenceMatrix::from_items(
            &items(&[
                &["deep learning", "machine learning", "python", "statistics"],
            ]),
            1,
        );
        let freqs: TagFrequencyMap = [("machine learning", 5), ("python", 8), ("statistics", 2)]
            .into_iter()
            .collect();

        let related = suggest_related("deep learning", &matrix, &freqs);
        let order: Vec<&str> = related.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(order, vec!["machine learning", "python", "statistics"]);
        assert_eq!(related[0].word_overlap, 1);
        assert_eq!(related[0].cooccurrence, 1);
        assert!(suggest_related("unknown", &matrix, &freqs).is_empty());
    }

    #[test]
    fn test_suggest_queries() {
        let related = vec![RelatedTag {
            tag: "ml".to_string(),
            word_overlap: 0,
            frequency: 3,
            cooccurrence: 2,
        }];
        let queries = suggest_queries("python", &related);
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].query, r#""python" AND "ml""#);
        assert_eq!(queries[1].query, r#""python" OR "ml""#);
        assert_eq!(queries[2].query, r#""python" NOT "ml""#);
        assert!(suggest_queries("python", &[]).is_empty());
    }

    #[test]
    fn test_suggest_filter_combinations() {
        let hub: &[&str] = &["hub", "a", "b", "c", "d", "e"];
        let matrix = CooccurrenceMatrix::from_items(&items(&[hub]), 1);
        let tags: TagFrequencyMap = [("hub", 4), ("book", 3), ("journalArticle", 2)]
            .into_iter()
            .collect();

        let suggestions = suggest_filter_combinations(&tags, &matrix);
        // every tag on the hub item has 5 partners
        assert_eq!(suggestions.len(), FILTER_SUGGESTION_LIMIT + 1);
        let last = suggestions.last().unwrap();
        assert_eq!(last.name, "Academic Publications");
        assert_eq!(last.estimated_items, 5);
        assert_eq!(last.criteria.item_types.as_ref().unwrap().len(), 3);
    }
}
