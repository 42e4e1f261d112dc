//! Centralized default constants for tagsieve.
//!
//! **This module is the single source of truth** for shared default values.
//! The engine and the CLI reference these instead of defining their own
//! magic numbers.

// =============================================================================
// FREQUENCY
// =============================================================================

/// Lowest frequency a tag may have and still surface in a filtered result.
/// Frequency-0 tags never surface.
pub const MIN_FREQUENCY: u64 = 1;

/// Default number of tags kept by a top-N truncation.
pub const TOP_N: usize = 50;

/// Minimum cleaned tag length (characters).
pub const CLEAN_MIN_LENGTH: usize = 2;

/// Maximum cleaned tag length (characters).
pub const CLEAN_MAX_LENGTH: usize = 50;

// =============================================================================
// METADATA
// =============================================================================

/// Four-digit year pattern extracted from free-text dates. First match wins.
pub const YEAR_PATTERN: &str = r"\b(?:19|20)\d{2}\b";

// =============================================================================
// RELATIONSHIPS
// =============================================================================

/// Minimum co-occurrence count kept in a co-occurrence matrix.
pub const COOCCURRENCE_MIN_COUNT: u64 = 2;

/// Separator for hierarchical tag namespaces ("Research-Methods").
pub const HIERARCHY_SEPARATOR: &str = "-";

/// Maximum related tags returned by a suggestion request.
pub const RELATED_LIMIT: usize = 5;

/// Partners a tag needs to count as highly connected.
pub const HIGHLY_CONNECTED_MIN_PARTNERS: usize = 5;

/// Maximum "Related to" filter suggestions.
pub const FILTER_SUGGESTION_LIMIT: usize = 5;

/// Item types suggested as "Academic Publications".
pub const ACADEMIC_ITEM_TYPES: &[&str] = &["journalArticle", "book", "conferencePaper"];

// =============================================================================
// PERSISTENCE / EXPORT
// =============================================================================

/// Preference-store key under which all presets are kept.
pub const PRESETS_KEY: &str = "filter_presets";

/// Header row for CSV export.
pub const CSV_HEADER: &str = "tag,frequency";
