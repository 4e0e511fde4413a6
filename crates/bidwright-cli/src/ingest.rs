//! Ingestion pipeline: reads plain-text reference documents into the retrieval index.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use bidwright_store::{ReferenceMeta, Retriever};
use tracing::{info, warn};
use walkdir::WalkDir;

const EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Default)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
}

/// Add every `.txt` / `.md` file under `path` (or `path` itself) to the index.
///
/// Each document is keyed by its file stem; the file name rides along as
/// `source` metadata. Empty files are skipped.
pub async fn ingest_path(retriever: &dyn Retriever, path: &Path) -> anyhow::Result<IngestStats> {
    let start = Instant::now();
    let files = collect_files(path)?;
    anyhow::ensure!(!files.is_empty(), "no .txt or .md files found at {}", path.display());
    eprintln!("  Found {} reference document(s) under {}", files.len(), path.display());

    let mut stats = IngestStats::default();
    for file in &files {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        if text.trim().is_empty() {
            warn!(file = %file.display(), "skipping empty document");
            stats.skipped += 1;
            continue;
        }

        let meta = reference_meta(file);
        let chunks = retriever
            .add(&text, meta)
            .await
            .with_context(|| format!("indexing {}", file.display()))?;
        stats.documents += 1;
        stats.chunks += chunks;
        eprintln!("  {} → {chunks} chunk(s)", file.display());
    }

    stats.elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        documents = stats.documents,
        chunks = stats.chunks,
        skipped = stats.skipped,
        "ingest complete"
    );
    Ok(stats)
}

fn reference_meta(file: &Path) -> ReferenceMeta {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let name = file
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    ReferenceMeta::new(stem).with("source", name)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Supported files, depth-first, sorted for a stable ingest order.
/// Symlinks are not followed.
fn collect_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", path.display()))?;
        if entry.file_type().is_file() && has_supported_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
