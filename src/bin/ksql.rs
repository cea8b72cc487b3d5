//! ksql: compile and inspect ksqlDB statements from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Compile a serialized query AST
//! ksql compile query.json
//!
//! # CREATE TABLE from a schema + metadata document
//! ksql create movies.json --kind table --if-not-exists
//!
//! # Decode a captured /query-stream response
//! curl ... | ksql decode --format query-stream
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use futures::StreamExt;
use ksql::prelude::*;
use serde::Deserialize;
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, BufReader};

#[derive(Parser)]
#[command(name = "ksql")]
#[command(version)]
#[command(about = "Compile ksqlDB push queries and decode streaming responses", long_about = None)]
#[command(after_help = "EXAMPLES:
    ksql compile query.json
    ksql create movies.json --kind table --if-not-exists
    ksql decode response.txt --format query --json")]
struct Cli {
    /// Config file (defaults to ./ksql.toml, then the user config dir)
    #[arg(long, env = "KSQL_CONFIG")]
    config: Option<PathBuf>,

    /// Print input details
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query AST (JSON) into a push query
    Compile {
        /// JSON file holding a serialized `Query`
        file: PathBuf,
        /// Keep source names as written
        #[arg(long)]
        no_pluralize: bool,
    },
    /// Generate a CREATE STREAM/TABLE statement
    Create {
        /// JSON file with `metadata` and either `schema` or `query`
        file: PathBuf,
        #[arg(short, long, value_enum, default_value = "stream")]
        kind: EntityKind,
        /// CREATE OR REPLACE
        #[arg(long, conflicts_with = "source")]
        replace: bool,
        /// CREATE SOURCE (read-only)
        #[arg(long)]
        source: bool,
        #[arg(long)]
        if_not_exists: bool,
    },
    /// Decode a captured streaming response
    Decode {
        /// Response file; stdin when omitted
        file: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        format: Option<Format>,
        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EntityKind {
    Stream,
    Table,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    QueryStream,
    Query,
}

impl From<Format> for ResponseFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::QueryStream => ResponseFormat::QueryStream,
            Format::Query => ResponseFormat::Query,
        }
    }
}

/// Input document of `ksql create`.
#[derive(Deserialize)]
struct CreateDocument {
    #[serde(default)]
    metadata: EntityCreationMetadata,
    schema: Option<SchemaDescriptor>,
    query: Option<Query>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => KsqlConfig::from_path(path)?,
        None => KsqlConfig::load()?,
    };

    match cli.command {
        Commands::Compile { file, no_pluralize } => {
            let query: Query = read_json(&file, cli.verbose)?;
            let mut options = config.compiler;
            if no_pluralize {
                options = options.without_pluralization();
            }
            println!("{}", query.to_ksql(&options)?);
        }
        Commands::Create {
            file,
            kind,
            replace,
            source,
            if_not_exists,
        } => {
            let document: CreateDocument = read_json(&file, cli.verbose)?;
            let kind = statement_kind(kind, replace, source);
            let sql = match (&document.schema, &document.query) {
                (Some(schema), None) => {
                    create_statement(schema, &document.metadata, kind, if_not_exists)?
                }
                (None, Some(query)) => create_as_select(
                    query,
                    &document.metadata,
                    kind,
                    if_not_exists,
                    &config.compiler,
                )?,
                _ => anyhow::bail!(
                    "expected exactly one of `schema` or `query` in {}",
                    file.display()
                ),
            };
            println!("{}", sql);
        }
        Commands::Decode { file, format, json } => {
            let format = format.map(ResponseFormat::from).unwrap_or(config.decoder.format);
            decode_response(file, format, json, cli.verbose).await?;
        }
    }
    Ok(())
}

fn statement_kind(kind: EntityKind, replace: bool, source: bool) -> StatementKind {
    match (kind, replace, source) {
        (EntityKind::Stream, _, true) => StatementKind::CreateSourceStream,
        (EntityKind::Stream, true, _) => StatementKind::CreateOrReplaceStream,
        (EntityKind::Stream, false, false) => StatementKind::CreateStream,
        (EntityKind::Table, _, true) => StatementKind::CreateSourceTable,
        (EntityKind::Table, true, _) => StatementKind::CreateOrReplaceTable,
        (EntityKind::Table, false, false) => StatementKind::CreateTable,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, verbose: bool) -> anyhow::Result<T> {
    if verbose {
        eprintln!("{} {}", "Input:".dimmed(), path.display().to_string().yellow());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

async fn decode_response(
    file: Option<PathBuf>,
    format: ResponseFormat,
    json: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let reader: Box<dyn AsyncBufRead + Send + Unpin> = match &file {
        Some(path) => {
            if verbose {
                eprintln!("{} {}", "Input:".dimmed(), path.display().to_string().yellow());
            }
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut stream =
        QueryStream::<Json>::open(lines_from_reader(reader), format, RowShape::Record).await?;
    let columns = stream.header().column_names.clone();
    if verbose {
        if let Some(id) = &stream.header().query_id {
            eprintln!("{} {}", "Query id:".dimmed(), id.cyan());
        }
    }

    let mut rows = Vec::new();
    while let Some(row) = stream.next().await {
        rows.push(row?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        format_table(&columns, &rows);
    }
    Ok(())
}

fn format_table(columns: &[String], rows: &[Json]) {
    if rows.is_empty() {
        println!("{}", "(no rows)".dimmed());
        return;
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(val_to_string).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:width$}", cell, width = *w))
            .collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s) decoded", rows.len().to_string().cyan());
}

fn val_to_string(val: &Json) -> String {
    match val {
        Json::Null => "NULL".to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::String(s) => s.clone(),
        _ => val.to_string(),
    }
}
