use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use postings_core::{Document, FieldName, IndexBuilder, IndexReader, Pipeline};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A field holds either one string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    One(String),
    Many(Vec<String>),
}

type InputDoc = BTreeMap<String, FieldValue>;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect a term-frequency inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
    },
    /// Print the number of distinct terms and documents
    Stats {
        #[arg(long, default_value = "./index")]
        index: String,
    },
    /// Print the k most frequent terms
    TopK {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Print the postings of one term
    Postings {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        term: String,
        /// Field whose analyzer normalizes the term (default: content)
        #[arg(long)]
        field: Option<String>,
    },
    /// Documents containing every term, with summed frequencies
    Query {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(required = true)]
        terms: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => build_index(&input, &output),
        Commands::Stats { index } => {
            let reader = open_reader(&index)?;
            print_json(&json!({
                "key_terms": reader.total_key_terms(),
                "value_terms": reader.total_value_terms(),
            }))
        }
        Commands::TopK { index, k } => {
            let reader = open_reader(&index)?;
            let terms = reader.top_k(k).unwrap_or_default();
            let ranked: Vec<_> = terms
                .iter()
                .filter_map(|t| reader.posting(t).map(|p| json!({ "term": t, "total_term_frequency": p.total_term_frequency() })))
                .collect();
            print_json(&json!({ "k": k, "terms": ranked }))
        }
        Commands::Postings { index, term, field } => {
            let field = match field {
                Some(name) => name.parse::<FieldName>()?,
                None => FieldName::Content,
            };
            let reader = open_reader(&index)?;
            let pipeline = Pipeline::standard();
            let Some(term) = pipeline.normalize(field, &term).into_iter().next() else {
                bail!("{term:?} has no indexable terms");
            };
            match reader.get_postings(&term) {
                Some(postings) => print_json(&json!({ "term": term, "postings": postings })),
                None => print_json(&json!({ "term": term, "error": "not found" })),
            }
        }
        Commands::Query { index, terms } => {
            let reader = open_reader(&index)?;
            let pipeline = Pipeline::standard();
            let normalized: Vec<String> = terms.iter().flat_map(|t| pipeline.normalize_query(t)).collect();
            match reader.query(normalized.as_slice()) {
                Ok(hits) => print_json(&json!({ "terms": normalized, "total_hits": hits.len(), "results": hits })),
                Err(err) if err.is_not_found() => print_json(&json!({ "terms": normalized, "error": err.to_string() })),
                Err(err) => Err(err.into()),
            }
        }
    }
}

fn open_reader(index: &str) -> Result<IndexReader> {
    IndexReader::try_open(index).with_context(|| format!("loading index from {index}"))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_index(input: &str, output: &str) -> Result<()> {
    let input_path = Path::new(input);
    let mut builder = IndexBuilder::standard(output);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input {input} does not exist");
    }

    let mut rejected = 0usize;
    for file in files {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)
        } else {
            read_json(&file)
        }
        .with_context(|| format!("reading {}", file.display()))?;

        for doc in docs {
            if let Err(err) = builder.add_document(&doc) {
                tracing::warn!(file = %file.display(), error = %err, "rejected document");
                rejected += 1;
            }
        }
    }

    tracing::info!(num_docs = builder.documents_indexed(), num_terms = builder.terms().len(), rejected, "ingested documents");
    builder.close().with_context(|| format!("writing index to {output}"))?;
    Ok(())
}

fn read_jsonl(file: &Path) -> Result<Vec<Document>> {
    let reader = BufReader::new(File::open(file)?);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)?;
        docs.push(to_document(doc));
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<Document>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(|v| serde_json::from_value::<InputDoc>(v).map(to_document))
            .collect::<Result<Vec<_>, _>>()?,
        serde_json::Value::Object(_) => vec![to_document(serde_json::from_value(json)?)],
        _ => Vec::new(),
    };
    Ok(docs)
}

fn to_document(input: InputDoc) -> Document {
    let mut doc = Document::new();
    for (key, value) in input {
        let field: FieldName = match key.parse() {
            Ok(field) => field,
            Err(_) => {
                tracing::debug!(key = %key, "ignoring unknown field");
                continue;
            }
        };
        match value {
            FieldValue::One(v) => doc.add_value(field, v),
            FieldValue::Many(vs) => {
                for v in vs {
                    doc.add_value(field, v);
                }
            }
        }
    }
    doc
}
