//! Tag frequency maps and the deterministic transformations over them.
//!
//! Every operation takes a map by reference and returns a new one; nothing
//! here holds result state between calls.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::defaults::MIN_FREQUENCY;
use crate::models::{BibliographicItem, RawTag};

// =============================================================================
// TAG FREQUENCY MAP
// =============================================================================

/// Mapping from tag name to occurrence count.
///
/// Keys are unique. Iteration follows first-insertion order so that sorts
/// over the map are reproducible; equality ignores order. A tag that is not
/// present has an implied count of 0.
#[derive(Debug, Clone, Default)]
pub struct TagFrequencyMap {
    entries: Vec<(String, u64)>,
    positions: HashMap<String, usize>,
}

impl TagFrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag's count. Last write wins; the tag keeps its first position.
    pub fn insert(&mut self, tag: impl Into<String>, count: u64) {
        let tag = tag.into();
        match self.positions.get(&tag) {
            Some(&pos) => self.entries[pos].1 = count,
            None => {
                self.positions.insert(tag.clone(), self.entries.len());
                self.entries.push((tag, count));
            }
        }
    }

    /// Add `by` to a tag's count, inserting it if absent.
    pub fn increment(&mut self, tag: &str, by: u64) {
        match self.positions.get(tag) {
            Some(&pos) => self.entries[pos].1 += by,
            None => self.insert(tag, by),
        }
    }

    /// Count for `tag`, or `None` if absent.
    pub fn get(&self, tag: &str) -> Option<u64> {
        self.positions.get(tag).map(|&pos| self.entries[pos].1)
    }

    /// Count for `tag`; absent tags count 0.
    pub fn count(&self, tag: &str) -> u64 {
        self.get(tag).unwrap_or(0)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.positions.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(tag, count)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(t, c)| (t.as_str(), *c))
    }

    /// Tag names in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    /// A new map holding the entries that satisfy `keep`, order preserved.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str, u64) -> bool,
    {
        self.iter().filter(|(t, c)| keep(t, *c)).collect()
    }

    /// Entries sorted by descending count. Ties keep insertion order.
    pub fn sorted_desc(&self) -> Vec<(&str, u64)> {
        let mut sorted: Vec<(&str, u64)> = self.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }
}

impl PartialEq for TagFrequencyMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(t, c)| other.get(t) == Some(c))
    }
}

impl Eq for TagFrequencyMap {}

impl<S: Into<String>> FromIterator<(S, u64)> for TagFrequencyMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (tag, count) in iter {
            map.insert(tag, count);
        }
        map
    }
}

impl<S: Into<String>> Extend<(S, u64)> for TagFrequencyMap {
    fn extend<I: IntoIterator<Item = (S, u64)>>(&mut self, iter: I) {
        for (tag, count) in iter {
            self.insert(tag, count);
        }
    }
}

impl IntoIterator for TagFrequencyMap {
    type Item = (String, u64);
    type IntoIter = std::vec::IntoIter<(String, u64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for TagFrequencyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (tag, count) in self.iter() {
            map.serialize_entry(tag, &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TagFrequencyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrequencyVisitor;

        impl<'de> Visitor<'de> for FrequencyVisitor {
            type Value = TagFrequencyMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of tag names to non-negative counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = TagFrequencyMap::new();
                while let Some((tag, count)) = access.next_entry::<String, u64>()? {
                    map.insert(tag, count);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FrequencyVisitor)
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Summary statistics over a frequency map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TagStatistics {
    pub total_tags: usize,
    pub total_occurrences: u64,
    /// `total_occurrences / total_tags`; 0.0 for an empty map.
    pub avg_frequency: f64,
    pub max_frequency: u64,
    pub min_frequency: u64,
    /// Tags seen exactly once.
    pub frequency_one_tags: usize,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Build a map from a tag source. Empty names are skipped; duplicates are
/// last-write-wins.
pub fn ingest(raw: &[RawTag]) -> TagFrequencyMap {
    let map: TagFrequencyMap = raw
        .iter()
        .filter(|t| !t.name().is_empty())
        .map(|t| (t.name(), t.count()))
        .collect();
    debug!(input_count = raw.len(), result_count = map.len(), "Ingested tag source");
    map
}

/// Count tag occurrences across items: a tag on N items has frequency N.
///
/// This is the canonical frequency when item data is available; it reflects
/// only the items supplied, not the whole library.
pub fn ingest_from_items(items: &[BibliographicItem]) -> TagFrequencyMap {
    let mut map = TagFrequencyMap::new();
    for tag in items.iter().flat_map(|item| item.tags.iter()) {
        map.increment(tag, 1);
    }
    debug!(input_count = items.len(), result_count = map.len(), "Counted tags from items");
    map
}

/// Keep tags with `min <= count` and, when `max` is set, `count <= max`.
/// `min` defaults to 1.
pub fn filter_by_frequency(map: &TagFrequencyMap, min: Option<u64>, max: Option<u64>) -> TagFrequencyMap {
    let min = min.unwrap_or(MIN_FREQUENCY);
    map.filtered(|_, count| count >= min && max.map_or(true, |max| count <= max))
}

/// Keep tags whose name contains `term`.
pub fn search_by_substring(map: &TagFrequencyMap, term: &str, case_sensitive: bool) -> TagFrequencyMap {
    if case_sensitive {
        map.filtered(|tag, _| tag.contains(term))
    } else {
        let needle = term.to_lowercase();
        map.filtered(|tag, _| tag.to_lowercase().contains(&needle))
    }
}

/// Keep tags whose name contains ANY of `terms` (case-insensitive).
pub fn search_any(map: &TagFrequencyMap, terms: &[String]) -> TagFrequencyMap {
    let needles: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    map.filtered(|tag, _| {
        let tag = tag.to_lowercase();
        needles.iter().any(|n| tag.contains(n.as_str()))
    })
}

/// The `n` most frequent tags. Ties keep input order.
pub fn top_n(map: &TagFrequencyMap, n: usize) -> TagFrequencyMap {
    map.sorted_desc().into_iter().take(n).collect()
}

/// Trim a tag name and collapse inner whitespace runs to one space.
pub fn normalize_tag(tag: &str) -> String {
    tag.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite item tags with [`normalize_tag`] so they line up with a
/// [`clean`]ed frequency map.
pub fn normalize_item_tags(items: &mut [BibliographicItem]) {
    for item in items {
        for tag in &mut item.tags {
            *tag = normalize_tag(tag);
        }
    }
}

/// Normalize tag names with [`normalize_tag`], then keep names whose length
/// in characters is within `min_len..=max_len`.
pub fn clean(map: &TagFrequencyMap, min_len: usize, max_len: usize) -> TagFrequencyMap {
    let mut cleaned = TagFrequencyMap::new();
    for (tag, count) in map.iter() {
        let normalized = normalize_tag(tag);
        let len = normalized.chars().count();
        if !normalized.is_empty() && (min_len..=max_len).contains(&len) {
            cleaned.insert(normalized, count);
        }
    }
    cleaned
}

/// Summary statistics for `map`.
pub fn statistics(map: &TagFrequencyMap) -> TagStatistics {
    if map.is_empty() {
        return TagStatistics::default();
    }

    let total_occurrences = map.total();
    TagStatistics {
        total_tags: map.len(),
        total_occurrences,
        avg_frequency: total_occurrences as f64 / map.len() as f64,
        max_frequency: map.iter().map(|(_, c)| c).max().unwrap_or(0),
        min_frequency: map.iter().map(|(_, c)| c).min().unwrap_or(0),
        frequency_one_tags: map.iter().filter(|(_, c)| *c == 1).count(),
    }
}
