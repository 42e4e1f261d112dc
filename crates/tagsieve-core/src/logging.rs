//! Structured logging field name constants for tagsieve.
//!
//! Every crate in the workspace uses these names so log output can be
//! queried by the same keys regardless of which component emitted it.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation aborted, result unusable |
//! | WARN  | Recoverable issue, permissive fallback applied |
//! | INFO  | Command completions, preset saves |
//! | DEBUG | Decision points: each filter step, parse results |
//! | TRACE | Per-tag iteration, per-item matching |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component emitting the event.
/// Values: "query", "frequency", "metadata", "filter", "relations", "preset", "cli"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "parse", "apply", "cooccurrence", "save"
pub const OPERATION: &str = "op";

/// Filter pipeline step name.
/// Values: "boolean_query", "search_terms", "frequency", "metadata",
/// "creator_name", "include_pattern", "exclude_patterns", "top_n"
pub const STEP: &str = "step";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Boolean query text.
pub const QUERY: &str = "query";

/// Tag name being operated on.
pub const TAG: &str = "tag";

/// Preset name.
pub const PRESET: &str = "preset";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of tags or items handed to an operation.
pub const INPUT_COUNT: &str = "input_count";

/// Number of tags or items an operation produced.
pub const RESULT_COUNT: &str = "result_count";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether the query mixed AND with OR.
pub const AMBIGUOUS: &str = "ambiguous";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
