use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docline_core::{Collection, CollectionOptions, OpenMode};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docline")]
#[command(about = "Docline CLI - inspect and edit JSON-lines document collections")]
#[command(version)]
struct Cli {
    /// Collection file path (":memory:" for a throwaway collection)
    #[arg(long, global = true, default_value = "collection.jsonl")]
    file: PathBuf,

    /// Primary key field
    #[arg(long, global = true, default_value = "_id")]
    primary_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count documents matching a filter
    Count {
        /// JSON filter, e.g. '{"a": {"b": 1}}'
        #[arg(long, default_value = "{}")]
        filter: String,
    },
    /// Print documents matching a filter, one per line
    Find {
        /// JSON filter
        #[arg(long, default_value = "{}")]
        filter: String,
        /// Maximum number of documents (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Print the document stored under an id
    Get { id: String },
    /// Insert documents from a JSON-lines file ("-" for stdin)
    Insert { source: PathBuf },
    /// Delete documents matching a filter
    Delete {
        /// JSON filter
        #[arg(long)]
        filter: String,
        /// Delete only the first match
        #[arg(long)]
        one: bool,
    },
    /// Write the whole collection as JSON lines to stdout
    Dump,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = CollectionOptions::new().with_primary_key(cli.primary_key.as_str());

    match cli.command {
        Commands::Count { filter } => count(&cli.file, options, &filter),
        Commands::Find { filter, limit } => find(&cli.file, options, &filter, limit),
        Commands::Get { id } => get(&cli.file, options, &id),
        Commands::Insert { source } => insert(&cli.file, options, &source),
        Commands::Delete { filter, one } => delete(&cli.file, options, &filter, one),
        Commands::Dump => dump(&cli.file, options),
    }
}

fn parse_filter(filter: &str) -> Result<Value> {
    serde_json::from_str(filter).with_context(|| format!("Invalid JSON filter: {}", filter))
}

fn open(path: &Path, mode: OpenMode, options: CollectionOptions) -> Result<Collection> {
    Collection::open(path, mode, options)
        .with_context(|| format!("Failed to open collection: {}", path.display()))
}

fn count(path: &Path, options: CollectionOptions, filter: &str) -> Result<()> {
    let filter = parse_filter(filter)?;
    let mut collection = open(path, OpenMode::Read, options)?;
    let found = collection
        .find(&filter, 0)
        .with_context(|| "Failed to query collection")?;
    println!("{}", found.count());
    Ok(())
}

fn find(path: &Path, options: CollectionOptions, filter: &str, limit: usize) -> Result<()> {
    let filter = parse_filter(filter)?;
    let mut collection = open(path, OpenMode::Read, options)?;
    let found = collection
        .find(&filter, limit)
        .with_context(|| "Failed to query collection")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for doc in found.iter() {
        serde_json::to_writer(&mut out, &doc).with_context(|| "Failed to serialize document")?;
        writeln!(out)?;
    }
    Ok(())
}

fn get(path: &Path, options: CollectionOptions, id: &str) -> Result<()> {
    let collection = open(path, OpenMode::Read, options)?;
    let doc = collection
        .get(id)
        .with_context(|| format!("No document with id '{}'", id))?;
    println!("{}", doc);
    Ok(())
}

/// Insert every line of `source` as one document
fn insert(path: &Path, options: CollectionOptions, source: &Path) -> Result<()> {
    let content = if source == Path::new("-") {
        io::read_to_string(io::stdin()).with_context(|| "Failed to read stdin")?
    } else {
        fs::read_to_string(source)
            .with_context(|| format!("Failed to read file: {}", source.display()))?
    };

    let mut docs = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {}", number + 1))?;
        if !doc.is_object() {
            bail!("Line {} must be a JSON object", number + 1);
        }
        docs.push(doc);
    }

    let ids = Collection::with_open(path, OpenMode::Append, options, |c| c.update_many(docs))
        .with_context(|| format!("Failed to insert documents into {}", path.display()))?;
    for id in &ids {
        println!("{}", id);
    }
    eprintln!("Inserted {} documents into {}", ids.len(), path.display());
    Ok(())
}

fn delete(path: &Path, options: CollectionOptions, filter: &str, one: bool) -> Result<()> {
    let filter = parse_filter(filter)?;
    let deleted = Collection::with_open(path, OpenMode::Append, options, |c| {
        if one {
            c.delete_one(&filter)
        } else {
            c.delete_many(&filter)
        }
    })
    .with_context(|| format!("Failed to delete from {}", path.display()))?;
    println!("Deleted {} documents", deleted);
    Ok(())
}

fn dump(path: &Path, options: CollectionOptions) -> Result<()> {
    let collection = open(path, OpenMode::Read, options)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    collection
        .dump_to(&mut out)
        .with_context(|| "Failed to write collection")?;
    Ok(())
}
