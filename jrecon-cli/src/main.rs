//! jrecon CLI - Command-line tool for schema-driven reconstruction
//!
//! This binary provides command-line interfaces for:
//! - fingerprint: print the canonical form and fingerprint of a schema
//! - index: list the schema index built from a root document
//! - validate: check JSON/NDJSON data against a registered type
//! - reconstruct: rebuild typed trees from JSON/NDJSON data

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use jrecon_engine::{
    EngineOptions, Node, Registry, ResolveLimits, SchemaIndex, Session, TieBreak, WrapperType,
};
use jrecon_schema::{canonicalize, canonicalize_exact, Fingerprint};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jrecon")]
#[command(about = "Schema-driven reconstruction of typed JSON")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides it.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form and fingerprint of a schema
    Fingerprint {
        /// Schema file (.json)
        schema: PathBuf,
        /// Keep descriptive keys (definitions, title, ...) in the canonical form
        #[arg(long)]
        exact: bool,
    },
    /// Register a root document and list its schema index
    ///
    /// Examples:
    ///   jrecon index schema.json
    ///   jrecon index schema.json --format json
    Index {
        /// Root schema document (.json)
        root: PathBuf,
        /// Type name for the root document itself
        #[arg(long, default_value = "Root")]
        name: String,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = IndexFormat::Table)]
        format: IndexFormat,
    },
    /// Validate data against a registered type
    Validate {
        /// Root schema document (.json)
        root: PathBuf,
        /// Data file (JSON value, or NDJSON with --ndjson / .ndjson / .jsonl)
        data: PathBuf,
        /// Type to validate against (defaults to the root document)
        #[arg(long = "type")]
        type_name: Option<String>,
        /// Type name for the root document itself
        #[arg(long, default_value = "Root")]
        name: String,
        /// Treat the data file as NDJSON
        #[arg(long)]
        ndjson: bool,
    },
    /// Rebuild typed trees from raw data
    ///
    /// Examples:
    ///   jrecon reconstruct schema.json data.json --pretty
    ///   jrecon reconstruct schema.json events.ndjson --type Event --progress
    Reconstruct {
        /// Root schema document (.json)
        root: PathBuf,
        /// Data file (JSON value, or NDJSON with --ndjson / .ndjson / .jsonl)
        data: PathBuf,
        /// Type to reconstruct (defaults to the root document)
        #[arg(long = "type")]
        type_name: Option<String>,
        /// Type name for the root document itself
        #[arg(long, default_value = "Root")]
        name: String,
        /// Skip validation of each record before reconstruction
        #[arg(long)]
        no_validate: bool,
        /// Candidate selection for shared schemas (last, first, reject)
        #[arg(long, default_value_t = TieBreak::Last)]
        tie_break: TieBreak,
        /// Maximum recursion depth
        #[arg(long, default_value = "128")]
        max_depth: usize,
        /// Maximum `$ref` hops per resolution, also bounding nested anyOf/oneOf hops
        #[arg(long, default_value = "32")]
        max_ref_hops: usize,
        /// Let a `$ref` match types registered for the fragments it points to
        #[arg(long)]
        lookup_through_refs: bool,
        /// Emit plain JSON instead of `$type`-tagged output
        #[arg(long)]
        plain: bool,
        /// Pretty-print single-value output
        #[arg(long)]
        pretty: bool,
        /// Treat the data file as NDJSON
        #[arg(long)]
        ndjson: bool,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Show progress spinner while reconstructing
        #[arg(long)]
        progress: bool,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum IndexFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct BucketSummary<'a> {
    fingerprint: Fingerprint,
    types: Vec<&'a str>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Fingerprint { schema, exact } => {
            handle_fingerprint(&schema, exact)?;
        }
        Commands::Index { root, name, format } => {
            handle_index(&root, &name, format)?;
        }
        Commands::Validate {
            root,
            data,
            type_name,
            name,
            ndjson,
        } => {
            handle_validate(&root, &data, type_name.as_deref(), &name, ndjson)?;
        }
        Commands::Reconstruct {
            root,
            data,
            type_name,
            name,
            no_validate,
            tie_break,
            max_depth,
            max_ref_hops,
            lookup_through_refs,
            plain,
            pretty,
            ndjson,
            output,
            progress,
        } => {
            let options = EngineOptions {
                tie_break,
                max_depth,
                resolve: ResolveLimits {
                    max_ref_hops,
                    ..ResolveLimits::default()
                },
                lookup_through_refs,
            };
            handle_reconstruct(
                &root,
                &data,
                type_name.as_deref(),
                &name,
                options,
                !no_validate,
                OutputMode { plain, pretty },
                ndjson,
                output.as_deref(),
                progress,
            )?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn handle_fingerprint(path: &Path, exact: bool) -> Result<(), Box<dyn Error>> {
    let schema = read_json(path)?;
    let (fingerprint, canonical) = if exact {
        (Fingerprint::of_exact(&schema), canonicalize_exact(&schema))
    } else {
        (Fingerprint::of(&schema), canonicalize(&schema))
    };

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writeln!(writer, "fingerprint: {fingerprint}")?;
    writeln!(writer, "canonical: {canonical}")?;
    Ok(())
}

fn handle_index(path: &Path, name: &str, format: IndexFormat) -> Result<(), Box<dyn Error>> {
    let registry = load_registry(path, name)?;
    let index = SchemaIndex::build(&registry);

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    match format {
        IndexFormat::Table => print_index_table(&mut writer, &index)?,
        IndexFormat::Json => print_index_json(&mut writer, &index)?,
    }
    Ok(())
}

fn print_index_table(writer: &mut dyn Write, index: &SchemaIndex) -> Result<(), Box<dyn Error>> {
    writeln!(writer, "Fingerprint\tTypes")?;
    for (fingerprint, bucket) in index.buckets() {
        let names = bucket
            .iter()
            .map(|ty| ty.name())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "{}\t{}", fingerprint, names)?;
    }

    let stats = index.stats();
    writeln!(writer)?;
    writeln!(
        writer,
        "types: {}, buckets: {}, ambiguous: {}",
        stats.types, stats.buckets, stats.ambiguous_buckets
    )?;
    Ok(())
}

fn print_index_json(writer: &mut dyn Write, index: &SchemaIndex) -> Result<(), Box<dyn Error>> {
    let buckets: Vec<BucketSummary<'_>> = index
        .buckets()
        .map(|(fingerprint, bucket)| BucketSummary {
            fingerprint,
            types: bucket.iter().map(|ty| ty.name()).collect(),
        })
        .collect();

    let mut root = serde_json::Map::new();
    root.insert("stats".to_string(), serde_json::to_value(index.stats())?);
    root.insert("buckets".to_string(), serde_json::to_value(buckets)?);

    serde_json::to_writer_pretty(&mut *writer, &Value::Object(root))?;
    writeln!(writer)?;
    Ok(())
}

fn handle_validate(
    root: &Path,
    data: &Path,
    type_name: Option<&str>,
    name: &str,
    ndjson: bool,
) -> Result<(), Box<dyn Error>> {
    let session = Session::new(load_registry(root, name)?);
    let ty = session.wrapper_type(type_name.unwrap_or(name))?;
    let records = read_records(data, ndjson)?;

    let mut failures = 0usize;
    for (position, record) in records.iter().enumerate() {
        if let Err(err) = session.validate(ty, record) {
            failures += 1;
            if records.len() > 1 {
                eprintln!("record {}: {}", position + 1, err);
            } else {
                eprintln!("{err}");
            }
        }
    }

    if failures > 0 {
        return Err(format!(
            "{} of {} record(s) failed validation against '{}'",
            failures,
            records.len(),
            ty.name()
        )
        .into());
    }

    println!("valid: {} record(s) conform to '{}'", records.len(), ty.name());
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct OutputMode {
    plain: bool,
    pretty: bool,
}

#[allow(clippy::too_many_arguments)]
fn handle_reconstruct(
    root: &Path,
    data: &Path,
    type_name: Option<&str>,
    name: &str,
    options: EngineOptions,
    validate: bool,
    mode: OutputMode,
    ndjson: bool,
    output: Option<&Path>,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let session = Session::with_options(load_registry(root, name)?, options)?;
    let ty: Arc<WrapperType> = Arc::clone(session.wrapper_type(type_name.unwrap_or(name))?);
    let ndjson = is_ndjson(data, ndjson);
    let records = read_records(data, ndjson)?;

    let start = Instant::now();
    let mut progress_bar = show_progress.then(|| create_spinner("Reconstructing records"));

    let rendered = records
        .par_iter()
        .enumerate()
        .map(|(position, record)| {
            let node = session
                .reconstruct_from_value(&ty, record, validate)
                .map_err(|err| {
                    if ndjson {
                        format!("record {}: {}", position + 1, err)
                    } else {
                        err.to_string()
                    }
                })?;
            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
            Ok(render(&node, mode.plain))
        })
        .collect::<Result<Vec<Value>, String>>()?;

    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!("Reconstructed {} records", rendered.len()));
    }
    info!(
        records = rendered.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "reconstruction complete"
    );

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    write_rendered(&mut writer, &rendered, ndjson, mode.pretty)?;
    writer.flush()?;
    Ok(())
}

fn render(node: &Node, plain: bool) -> Value {
    if plain {
        node.to_value()
    } else {
        node.to_tagged_value()
    }
}

fn write_rendered(
    writer: &mut dyn Write,
    rendered: &[Value],
    ndjson: bool,
    pretty: bool,
) -> Result<(), Box<dyn Error>> {
    for value in rendered {
        if pretty && !ndjson {
            serde_json::to_writer_pretty(&mut *writer, value)?;
        } else {
            serde_json::to_writer(&mut *writer, value)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn load_registry(path: &Path, name: &str) -> Result<Registry, Box<dyn Error>> {
    let document = read_json(path)?;
    let mut builder = Registry::builder();
    builder.register_document(name, document)?;
    let registry = builder.build();
    debug!(
        path = %path.display(),
        types = registry.len(),
        "registered schema document"
    );
    Ok(registry)
}

fn read_json(path: &Path) -> Result<Value, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    let value = serde_json::from_str(&text)
        .map_err(|err| format!("invalid JSON in {}: {}", path.display(), err))?;
    Ok(value)
}

fn is_ndjson(path: &Path, force_ndjson: bool) -> bool {
    if force_ndjson {
        return true;
    }
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("ndjson" | "jsonl")
    )
}

fn read_records(path: &Path, force_ndjson: bool) -> Result<Vec<Value>, Box<dyn Error>> {
    if !is_ndjson(path, force_ndjson) {
        return Ok(vec![read_json(path)?]);
    }

    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    parse_ndjson(&text)
}

fn parse_ndjson(text: &str) -> Result<Vec<Value>, Box<dyn Error>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|err| -> Box<dyn Error> {
                format!("invalid JSON on line {}: {}", idx + 1, err).into()
            })
        })
        .collect()
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
