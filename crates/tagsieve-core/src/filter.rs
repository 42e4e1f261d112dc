//! The tag filter pipeline.
//!
//! A [`FilterEngine`] is built once from [`FilterCriteria`] (patterns are
//! compiled and the boolean query is parsed up front) and then applied to any
//! number of frequency maps. Steps run in a fixed order, each on the output
//! of the previous one:
//!
//! 1. boolean query per tag, or else
//! 2. search terms (OR substring)
//! 3. frequency bounds
//! 4. intersection with tags of items matching the metadata criteria
//! 5. creator strings against the *tag name*
//! 6. include regex
//! 7. exclude regexes
//! 8. top-N truncation
//!
//! An empty intermediate result ends the pipeline with an empty map.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::criteria::FilterCriteria;
use crate::error::{Error, Result};
use crate::frequency::{self, TagFrequencyMap};
use crate::metadata::{self, MetadataIndex};
use crate::models::BibliographicItem;
use crate::query::QueryExpression;
use crate::relations::CooccurrenceMatrix;

/// Compiled filter criteria.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    criteria: FilterCriteria,
    query: Option<QueryExpression>,
    include: Option<Regex>,
    excludes: Vec<Regex>,
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::invalid_pattern(pattern, e))
}

impl FilterEngine {
    /// Compile `criteria`. Fails only when a regex does not compile.
    pub fn new(criteria: FilterCriteria) -> Result<Self> {
        let query = criteria
            .boolean_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .map(QueryExpression::parse);

        if let Some(expr) = &query {
            if expr.is_ambiguous() {
                debug!(
                    query = criteria.boolean_query.as_deref().unwrap_or_default(),
                    ambiguous = true,
                    "Boolean query mixes AND with OR; evaluating as OR"
                );
            }
        }

        let include = criteria
            .regex_pattern
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(compile)
            .transpose()?;

        let excludes = criteria
            .exclude_patterns
            .iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            criteria,
            query,
            include,
            excludes,
        })
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// The parsed boolean query, if one is set.
    pub fn query(&self) -> Option<&QueryExpression> {
        self.query.as_ref()
    }

    /// Run the pipeline over `tags`. `index` supplies item metadata for
    /// step 4; without it that step is skipped.
    #[instrument(skip_all, fields(component = "filter", op = "apply", input_count = tags.len()))]
    pub fn apply(&self, tags: &TagFrequencyMap, index: Option<&MetadataIndex>) -> TagFrequencyMap {
        let c = &self.criteria;

        let mut current = if let Some(expr) = &self.query {
            let out = tags.filtered(|tag, _| expr.matches_tag(tag));
            log_step("boolean_query", &out);
            out
        } else if let Some(terms) = c.search_terms.as_ref().filter(|t| !t.is_empty()) {
            let out = frequency::search_any(tags, terms);
            log_step("search_terms", &out);
            out
        } else {
            tags.clone()
        };
        if current.is_empty() {
            return current;
        }

        current = frequency::filter_by_frequency(&current, c.min_frequency, c.max_frequency);
        log_step("frequency", &current);
        if current.is_empty() {
            return current;
        }

        if c.has_metadata_constraints() {
            match index {
                Some(index) => {
                    let allowed = index.tags_for_matching_items(c);
                    current = current.filtered(|tag, _| allowed.contains(tag));
                    log_step("metadata", &current);
                    if current.is_empty() {
                        return current;
                    }
                }
                None => warn!(
                    step = "metadata",
                    "Metadata criteria set but no item data supplied; step skipped"
                ),
            }
        }

        if let Some(creators) = c.creators.as_ref().filter(|c| !c.is_empty()) {
            let needles: Vec<String> = creators.iter().map(|n| n.to_lowercase()).collect();
            current = current.filtered(|tag, _| {
                let tag = tag.to_lowercase();
                needles.iter().any(|n| tag.contains(n.as_str()))
            });
            log_step("creator_name", &current);
            if current.is_empty() {
                return current;
            }
        }

        if let Some(include) = &self.include {
            current = current.filtered(|tag, _| include.is_match(tag));
            log_step("include_pattern", &current);
            if current.is_empty() {
                return current;
            }
        }

        if !self.excludes.is_empty() {
            current = current.filtered(|tag, _| !self.excludes.iter().any(|re| re.is_match(tag)));
            log_step("exclude_patterns", &current);
            if current.is_empty() {
                return current;
            }
        }

        if let Some(n) = c.max_tags {
            current = frequency::top_n(&current, n);
            log_step("top_n", &current);
        }

        debug!(result_count = current.len(), "Filter pipeline complete");
        current
    }

    /// Item-level filtering: the metadata predicate, then tag constraints
    /// checked against each item's own tags.
    pub fn filter_items<'a>(&self, items: &'a [BibliographicItem]) -> Vec<&'a BibliographicItem> {
        let result: Vec<&BibliographicItem> =
            items.iter().filter(|item| self.item_matches(item)).collect();
        debug!(
            input_count = items.len(),
            result_count = result.len(),
            "Filtered items"
        );
        result
    }

    fn item_matches(&self, item: &BibliographicItem) -> bool {
        if !metadata::matches_criteria(item, &self.criteria) {
            return false;
        }

        if let Some(expr) = &self.query {
            if !expr.evaluate(&item.tags) {
                return false;
            }
        } else if let Some(terms) = self.criteria.search_terms.as_ref().filter(|t| !t.is_empty()) {
            let lowered: Vec<String> = item.tags.iter().map(|t| t.to_lowercase()).collect();
            let hit = terms.iter().any(|term| {
                let term = term.to_lowercase();
                lowered.iter().any(|tag| tag.contains(&term))
            });
            if !hit {
                return false;
            }
        }

        if let Some(include) = &self.include {
            if !item.tags.iter().any(|t| include.is_match(t)) {
                return false;
            }
        }

        !self
            .excludes
            .iter()
            .any(|re| item.tags.iter().any(|t| re.is_match(t)))
    }
}

fn log_step(step: &'static str, current: &TagFrequencyMap) {
    debug!(step = step, result_count = current.len(), "Filter step applied");
}

/// Tags co-occurring with `target` at least `min_cooccurrence` times that
/// are present in `tags`, with their frequencies.
pub fn filter_by_cooccurrence(
    tags: &TagFrequencyMap,
    matrix: &CooccurrenceMatrix,
    target: &str,
    min_cooccurrence: u64,
) -> TagFrequencyMap {
    let Some(partners) = matrix.partners(target) else {
        return TagFrequencyMap::new();
    };
    partners
        .iter()
        .filter(|(_, count)| **count >= min_cooccurrence)
        .filter_map(|(tag, _)| tags.get(tag).map(|freq| (tag.as_str(), freq)))
        .collect()
}

/// A named group of related item types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTypeGroup {
    pub name: String,
    pub item_types: Vec<String>,
}

/// Predefined groups of library item types, for coarse type filtering.
pub fn item_type_groups() -> Vec<ItemTypeGroup> {
    let groups: [(&str, &[&str]); 7] = [
        ("Academic Articles", &["journalArticle", "conferencePaper", "preprint"]),
        ("Books", &["book", "bookSection"]),
        ("Reports & Documents", &["report", "document", "manuscript"]),
        ("Theses", &["thesis", "dissertation"]),
        ("Media", &["podcast", "videoRecording", "film"]),
        ("Web Resources", &["webpage", "blogPost", "forumPost"]),
        ("Legal", &["case", "statute", "patent"]),
    ];
    groups
        .iter()
        .map(|(name, types)| ItemTypeGroup {
            name: name.to_string(),
            item_types: types.iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}

/// Item-type group lookup by name.
pub fn item_type_group(name: &str) -> Option<ItemTypeGroup> {
    item_type_groups().into_iter().find(|g| g.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Creator;

    fn tags() -> TagFrequencyMap {
        [
            ("python", 8),
            ("machine learning", 5),
            ("deep learning", 2),
            ("draft notes", 4),
            ("smith archive", 3),
        ]
        .into_iter()
        .collect()
    }

    fn items() -> Vec<BibliographicItem> {
        vec![
            BibliographicItem::new("journalArticle")
                .with_date("2020")
                .with_creator(Creator::new("Jane", "Smith"))
                .with_tags(["python", "machine learning"]),
            BibliographicItem::new("book")
                .with_date("2005")
                .with_tags(["deep learning", "draft notes"]),
        ]
    }

    fn run(criteria: FilterCriteria) -> TagFrequencyMap {
        FilterEngine::new(criteria).unwrap().apply(&tags(), None)
    }

    #[test]
    fn test_empty_criteria_keeps_positive_frequencies() {
        assert_eq!(run(FilterCriteria::new()), tags());
    }

    #[test]
    fn test_boolean_query_supersedes_search_terms() {
        let result = run(FilterCriteria::new().search("python").query("learning NOT deep"));
        assert_eq!(result.len(), 1);
        assert!(result.contains("machine learning"));
    }

    #[test]
    fn test_blank_boolean_query_falls_back_to_search() {
        let result = run(FilterCriteria::new().search("PYTH").query("  "));
        assert_eq!(result.len(), 1);
        assert!(result.contains("python"));
    }

    #[test]
    fn test_search_terms_or() {
        let result = run(FilterCriteria::new().search("python").search("deep"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_frequency_bounds() {
        let result = run(FilterCriteria::new().min_frequency(3).max_frequency(5));
        assert_eq!(result.len(), 3);
        assert!(!result.contains("python"));
        assert!(!result.contains("deep learning"));
    }

    #[test]
    fn test_metadata_intersection() {
        let index = MetadataIndex::build(items());
        let engine = FilterEngine::new(FilterCriteria::new().item_type("book")).unwrap();
        let result = engine.apply(&tags(), Some(&index));
        let expected: TagFrequencyMap = [("deep learning", 2), ("draft notes", 4)].into_iter().collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_metadata_without_match_is_empty() {
        let index = MetadataIndex::build(items());
        let engine = FilterEngine::new(FilterCriteria::new().years(Some(2030), None)).unwrap();
        assert!(engine.apply(&tags(), Some(&index)).is_empty());
    }

    #[test]
    fn test_metadata_without_index_is_skipped() {
        let result = run(FilterCriteria::new().item_type("book"));
        assert_eq!(result.len(), tags().len());
    }

    #[test]
    fn test_creator_filter_matches_tag_names() {
        // "smith" filters tag names, not item creators
        let result = run(FilterCriteria::new().creator("SMITH"));
        assert_eq!(result.len(), 1);
        assert!(result.contains("smith archive"));
    }

    #[test]
    fn test_include_and_exclude_patterns() {
        let result = run(
            FilterCriteria::new()
                .include_pattern("LEARNING|notes")
                .exclude_pattern("^deep"),
        );
        let expected: TagFrequencyMap = [("machine learning", 5), ("draft notes", 4)].into_iter().collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_top_n_last() {
        let result = run(FilterCriteria::new().max_tags(2));
        let order: Vec<&str> = result.tags().collect();
        assert_eq!(order, vec!["python", "machine learning"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = FilterEngine::new(FilterCriteria::new().exclude_pattern("(")).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert!(FilterEngine::new(FilterCriteria::new().include_pattern("[a-")).is_err());
    }

    #[test]
    fn test_empty_intermediate_short_circuits() {
        let result = run(FilterCriteria::new().search("zzz").max_tags(5));
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_items() {
        let items = items();
        let engine = FilterEngine::new(FilterCriteria::new().query("python AND learning")).unwrap();
        let matched = engine.filter_items(&items);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].item_type, "journalArticle");

        let engine = FilterEngine::new(FilterCriteria::new().creator("smith").exclude_pattern("draft")).unwrap();
        assert_eq!(engine.filter_items(&items).len(), 1);

        let engine = FilterEngine::new(FilterCriteria::new().search("deep").item_type("journalArticle")).unwrap();
        assert!(engine.filter_items(&items).is_empty());
    }

    #[test]
    fn test_filter_by_cooccurrence() {
        let matrix = CooccurrenceMatrix::from_items(
            &[
                BibliographicItem::new("book").with_tags(["python", "ml", "stats"]),
                BibliographicItem::new("book").with_tags(["python", "ml"]),
            ],
            1,
        );
        let freqs: TagFrequencyMap = [("ml", 2), ("stats", 1), ("python", 2)].into_iter().collect();

        let result = filter_by_cooccurrence(&freqs, &matrix, "python", 2);
        let expected: TagFrequencyMap = [("ml", 2)].into_iter().collect();
        assert_eq!(result, expected);
        assert!(filter_by_cooccurrence(&freqs, &matrix, "unknown", 1).is_empty());
    }

    #[test]
    fn test_item_type_groups() {
        let groups = item_type_groups();
        assert_eq!(groups.len(), 7);
        let books = item_type_group("Books").unwrap();
        assert_eq!(books.item_types, vec!["book", "bookSection"]);
        assert!(item_type_group("Nope").is_none());
    }
}
