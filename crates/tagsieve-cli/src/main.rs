//! tagsieve: filter and explore reference-library tags from the command line.
//!
//! Reads tag and item listings exported from the Zotero web API as JSON,
//! runs them through the tagsieve engine and prints JSON or CSV on stdout.
//! Logs go to stderr.

mod store;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value as JsonValue};
use tagsieve_core::defaults::{
    CLEAN_MAX_LENGTH, CLEAN_MIN_LENGTH, COOCCURRENCE_MIN_COUNT, HIERARCHY_SEPARATOR, RELATED_LIMIT,
    TOP_N,
};
use tagsieve_core::{
    clean, filter_by_cooccurrence, hierarchy, ingest, ingest_from_items, normalize_item_tags,
    parse_items, parse_tag_source, statistics, suggest_filter_combinations, suggest_queries,
    suggest_related, to_csv, to_json, top_n, BibliographicItem, CooccurrenceMatrix,
    CooccurrenceSource, FilterCriteria, FilterEngine, FilterPreset, MatchMode, MetadataIndex, PresetLibrary,
    QueryExpression, TagFrequencyMap,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::store::JsonFilePreferenceStore;

const DEFAULT_STORE_PATH: &str = "tagsieve-prefs.json";

#[derive(Parser)]
#[command(name = "tagsieve")]
#[command(author, version, about = "Tag query and filtering for reference libraries")]
#[command(propagate_version = true)]
struct Cli {
    /// Preference store holding saved filter presets (overrides TAGSIEVE_STORE env var)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where tag frequencies come from.
#[derive(Args, Clone)]
struct Sources {
    /// Tag listing (list of {tag, meta.numItems} or plain strings)
    #[arg(long, required_unless_present = "items")]
    tags: Option<PathBuf>,

    /// Item listing; frequencies are counted from item tags when given
    #[arg(long)]
    items: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the filter pipeline and print the surviving tags
    Filter {
        #[command(flatten)]
        sources: Sources,

        /// Criteria JSON file to start from
        #[arg(long, conflicts_with = "preset")]
        criteria: Option<PathBuf>,

        /// Saved preset to start from
        #[arg(long)]
        preset: Option<String>,

        /// Boolean query (supersedes --search)
        #[arg(short, long)]
        query: Option<String>,

        /// Substring search term (repeatable, OR-matched)
        #[arg(short, long)]
        search: Vec<String>,

        /// Minimum frequency
        #[arg(long)]
        min: Option<u64>,

        /// Maximum frequency
        #[arg(long)]
        max: Option<u64>,

        /// Keep only the N most frequent tags
        #[arg(long)]
        top: Option<usize>,

        /// Include regex
        #[arg(long)]
        include: Option<String>,

        /// Exclude regex (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Normalize whitespace in tag names and drop very short or long ones
        #[arg(long)]
        clean: bool,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Summary statistics for a tag listing
    Stats {
        #[command(flatten)]
        sources: Sources,

        /// How many of the most frequent tags to list
        #[arg(long, default_value_t = TOP_N)]
        top: usize,
    },

    /// Parse a boolean query and optionally evaluate it
    Query {
        /// Query expression, e.g. 'python AND "machine learning" NOT intro'
        expression: String,

        /// Labels to evaluate against (repeatable)
        #[arg(short, long)]
        label: Vec<String>,
    },

    /// Tag co-occurrence (word-overlap estimate when only --tags is given)
    Cooccur {
        #[command(flatten)]
        sources: Sources,

        #[arg(long, default_value_t = COOCCURRENCE_MIN_COUNT)]
        min_count: u64,

        /// Only list tags co-occurring with this tag
        #[arg(long)]
        target: Option<String>,
    },

    /// Parent/child groups of separator-delimited tags
    Hierarchy {
        #[command(flatten)]
        sources: Sources,

        #[arg(long, default_value = HIERARCHY_SEPARATOR)]
        separator: String,
    },

    /// Related tags, query and filter suggestions for a target tag
    Suggest {
        #[arg(long)]
        target: String,

        #[command(flatten)]
        sources: Sources,
    },

    /// Manage saved filter presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save criteria from a JSON file under a name
    Save {
        name: String,

        #[arg(long)]
        criteria: PathBuf,
    },
    /// List saved presets
    List,
    /// Print one preset
    Show { name: String },
    /// Delete a preset
    Delete { name: String },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();
    let started = Instant::now();

    match run(cli) {
        Ok(()) => {
            debug!(duration_ms = started.elapsed().as_millis() as u64, "Command completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!(
                duration_ms = started.elapsed().as_millis() as u64,
                error = %format!("{:#}", e),
                "Command failed"
            );
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "tagsieve=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tagsieve=info,tagsieve_core=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("tagsieve.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // stdout carries command output
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    debug!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

/// `--store`, else `TAGSIEVE_STORE`, else `tagsieve-prefs.json`.
fn store_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var("TAGSIEVE_STORE").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = store_path(cli.store);
    match cli.command {
        Commands::Filter {
            sources,
            criteria,
            preset,
            query,
            search,
            min,
            max,
            top,
            include,
            exclude,
            clean,
            format,
        } => {
            let base = match (criteria, preset) {
                (Some(path), _) => read_criteria(&path)?,
                (None, Some(name)) => {
                    let mut store = JsonFilePreferenceStore::open(&store)?;
                    PresetLibrary::new(&mut store).load(&name)?.load()
                }
                (None, None) => FilterCriteria::new(),
            };
            let overrides = FilterOverrides {
                query,
                search,
                min,
                max,
                top,
                include,
                exclude,
            };
            cmd_filter(&sources, overrides.apply(base), clean, format)
        }
        Commands::Stats { sources, top } => cmd_stats(&sources, top),
        Commands::Query { expression, label } => cmd_query(&expression, &label),
        Commands::Cooccur {
            sources,
            min_count,
            target,
        } => cmd_cooccur(&sources, min_count, target.as_deref()),
        Commands::Hierarchy { sources, separator } => cmd_hierarchy(&sources, &separator),
        Commands::Suggest { target, sources } => cmd_suggest(&target, &sources),
        Commands::Preset { action } => cmd_preset(&store, action),
    }
}

/// Command-line flags layered over criteria loaded from a file or preset.
struct FilterOverrides {
    query: Option<String>,
    search: Vec<String>,
    min: Option<u64>,
    max: Option<u64>,
    top: Option<usize>,
    include: Option<String>,
    exclude: Vec<String>,
}

impl FilterOverrides {
    fn apply(self, mut criteria: FilterCriteria) -> FilterCriteria {
        if let Some(query) = self.query {
            criteria = criteria.query(query);
        }
        for term in self.search {
            criteria = criteria.search(term);
        }
        if let Some(min) = self.min {
            criteria = criteria.min_frequency(min);
        }
        if let Some(max) = self.max {
            criteria = criteria.max_frequency(max);
        }
        if let Some(top) = self.top {
            criteria = criteria.max_tags(top);
        }
        if let Some(include) = self.include {
            criteria = criteria.include_pattern(include);
        }
        for pattern in self.exclude {
            criteria = criteria.exclude_pattern(pattern);
        }
        criteria
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// Frequencies plus the items they came from, when item data was given.
struct Library {
    frequencies: TagFrequencyMap,
    items: Option<Vec<BibliographicItem>>,
}

fn read_json(path: &Path) -> anyhow::Result<JsonValue> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn read_criteria(path: &Path) -> anyhow::Result<FilterCriteria> {
    serde_json::from_value(read_json(path)?)
        .with_context(|| format!("Invalid filter criteria in {}", path.display()))
}

fn load_library(sources: &Sources) -> anyhow::Result<Library> {
    let items = match &sources.items {
        Some(path) => Some(
            parse_items(&read_json(path)?)
                .with_context(|| format!("Invalid item listing in {}", path.display()))?,
        ),
        None => None,
    };

    let frequencies = match (&items, &sources.tags) {
        (Some(items), _) => ingest_from_items(items),
        (None, Some(path)) => ingest(
            &parse_tag_source(&read_json(path)?)
                .with_context(|| format!("Invalid tag listing in {}", path.display()))?,
        ),
        (None, None) => bail!("Either --tags or --items is required"),
    };

    info!(
        tags = frequencies.len(),
        items = items.as_ref().map_or(0, Vec::len),
        "Loaded library"
    );
    Ok(Library { frequencies, items })
}

fn cooccurrence_for(library: &Library, min_count: u64) -> CooccurrenceMatrix {
    let source = match &library.items {
        Some(items) => CooccurrenceSource::Items(items),
        None => CooccurrenceSource::WordOverlap(&library.frequencies),
    };
    CooccurrenceMatrix::build(source, min_count)
}

/// Frequencies and metadata index for the filter pipeline. With `normalize`,
/// item tags get the same whitespace cleanup as the frequency map so the
/// metadata step still finds them.
fn filter_inputs(library: Library, normalize: bool) -> (TagFrequencyMap, Option<MetadataIndex>) {
    if !normalize {
        return (library.frequencies, library.items.map(MetadataIndex::build));
    }
    let frequencies = clean(&library.frequencies, CLEAN_MIN_LENGTH, CLEAN_MAX_LENGTH);
    let index = library.items.map(|mut items| {
        normalize_item_tags(&mut items);
        MetadataIndex::build(items)
    });
    (frequencies, index)
}

fn print_json(value: &JsonValue) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// COMMANDS
// =============================================================================

fn cmd_filter(
    sources: &Sources,
    criteria: FilterCriteria,
    normalize: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let library = load_library(sources)?;
    let engine = FilterEngine::new(criteria)?;
    let (frequencies, index) = filter_inputs(library, normalize);
    let filtered = engine.apply(&frequencies, index.as_ref());

    match format {
        OutputFormat::Json => print_json(&to_json(&filtered)),
        OutputFormat::Csv => {
            print!("{}", to_csv(&filtered));
            Ok(())
        }
    }
}

fn cmd_stats(sources: &Sources, top: usize) -> anyhow::Result<()> {
    let library = load_library(sources)?;
    let mut output = serde_json::to_value(statistics(&library.frequencies))?;
    output["top_tags"] = to_json(&top_n(&library.frequencies, top));
    if let Some(items) = library.items {
        let index = MetadataIndex::build(items);
        output["items"] = json!(index.len());
        output["item_types"] = json!(index.item_types());
        output["languages"] = json!(index.languages());
        output["year_span"] = json!(index.year_span());
    }
    print_json(&output)
}

fn cmd_query(expression: &str, labels: &[String]) -> anyhow::Result<()> {
    let expr = QueryExpression::parse(expression);
    let mode = match expr.mode() {
        MatchMode::Any => "any",
        MatchMode::All => "all",
    };
    let mut output = json!({
        "terms": expr.terms,
        "operators": expr.operators,
        "negated_terms": expr.negated_terms,
        "mode": mode,
        "ambiguous": expr.is_ambiguous(),
    });
    if !labels.is_empty() {
        output["matches"] = json!(expr.evaluate(labels));
    }
    print_json(&output)
}

fn cmd_cooccur(sources: &Sources, min_count: u64, target: Option<&str>) -> anyhow::Result<()> {
    let library = load_library(sources)?;
    let matrix = cooccurrence_for(&library, min_count);
    match target {
        Some(target) => print_json(&to_json(&filter_by_cooccurrence(
            &library.frequencies,
            &matrix,
            target,
            min_count,
        ))),
        None => print_json(&serde_json::to_value(&matrix)?),
    }
}

fn cmd_hierarchy(sources: &Sources, separator: &str) -> anyhow::Result<()> {
    if separator.is_empty() {
        bail!("--separator must not be empty");
    }
    let library = load_library(sources)?;
    let tags: Vec<&str> = library.frequencies.tags().collect();
    print_json(&serde_json::to_value(hierarchy(&tags, separator))?)
}

fn cmd_suggest(target: &str, sources: &Sources) -> anyhow::Result<()> {
    let library = load_library(sources)?;
    let matrix = cooccurrence_for(&library, COOCCURRENCE_MIN_COUNT);

    let mut related = suggest_related(target, &matrix, &library.frequencies);
    related.truncate(RELATED_LIMIT);
    let queries = suggest_queries(target, &related);
    let filters = suggest_filter_combinations(&library.frequencies, &matrix);

    print_json(&json!({
        "target": target,
        "related": related,
        "queries": queries,
        "filters": filters,
    }))
}

fn cmd_preset(store_path: &Path, action: PresetAction) -> anyhow::Result<()> {
    let mut store = JsonFilePreferenceStore::open(store_path)?;
    debug!(path = %store.path().display(), "Using preference store");
    let mut library = PresetLibrary::new(&mut store);

    match action {
        PresetAction::Save { name, criteria } => {
            let criteria = read_criteria(&criteria)?;
            // Compile once so a bad regex never reaches the store
            FilterEngine::new(criteria.clone())?;
            let preset = FilterPreset::create(name, &criteria);
            print_json(&preset.to_value()?)?;
            library.save(preset)?;
        }
        PresetAction::List => {
            let summary: Vec<JsonValue> = library
                .list()?
                .into_iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "boolean_query": p.boolean_query,
                        "created_at": p.created_at,
                    })
                })
                .collect();
            print_json(&JsonValue::Array(summary))?;
        }
        PresetAction::Show { name } => {
            print_json(&library.load(&name)?.to_value()?)?;
        }
        PresetAction::Delete { name } => {
            let deleted = library.delete(&name)?;
            print_json(&json!({ "name": name, "deleted": deleted }))?;
        }
    }
    Ok(())
}
