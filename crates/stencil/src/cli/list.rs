//! List command - find draw.io documents in a directory

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_size, print_table};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_EXTENSION: &str = "drawio";

#[derive(Debug)]
pub struct ListArgs {
    pub dir: PathBuf,
    pub recursive: bool,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListedDocument {
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Serialize)]
struct ListOutput<'a> {
    directory: &'a Path,
    documents: &'a [ListedDocument],
}

pub fn run(args: ListArgs) -> anyhow::Result<()> {
    if !args.dir.exists() {
        return Err(HelpfulError::path_not_found(&args.dir).into());
    }
    if !args.dir.is_dir() {
        return Err(HelpfulError::not_a_directory(&args.dir).into());
    }

    let documents: Vec<ListedDocument> = discover_documents(&args.dir, args.recursive)
        .into_iter()
        .map(|path| {
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            ListedDocument { path, size }
        })
        .collect();

    if args.json {
        let output = ListOutput {
            directory: &args.dir,
            documents: &documents,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("No .drawio documents in {}", args.dir.display());
        return Ok(());
    }

    let rows = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            vec![
                (i + 1).to_string(),
                doc.path.display().to_string(),
                format_size(doc.size),
            ]
        })
        .collect();
    print_table(&["#", "Document", "Size"], rows);
    println!("{} document(s)", documents.len());

    Ok(())
}

/// Files in `dir` with a `.drawio` extension (any case), sorted by path.
pub fn discover_documents(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut paths: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_document(p))
        .collect();
    paths.sort();
    paths
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
        .unwrap_or(false)
}
