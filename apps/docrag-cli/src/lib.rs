//! Commands behind the `docrag` binary.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use docrag_core::config::{resolve_with_base, AppConfig, Config};
use docrag_core::source::SourceSet;
use docrag_core::traits::{ChunkStore, DocumentSource, TokenCounter};
use docrag_core::types::{Chunk, RetrievedChunk, SearchFilter};
use docrag_embed::get_default_token_counter;
use docrag_gateway::GatewayState;
use docrag_hybrid::DiskStore;
use docrag_split::Splitter;

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn splitter(settings: &AppConfig) -> Result<Splitter<Arc<dyn TokenCounter>>> {
    let counter: Arc<dyn TokenCounter> = Arc::from(get_default_token_counter(&settings.tokenizer)?);
    Ok(Splitter::new(counter, settings.splitter)?)
}

/// Split one Markdown file. The title defaults to the file stem.
pub fn split_file(settings: &AppConfig, path: &Path, title: Option<&str>) -> Result<Vec<Chunk>> {
    let markdown = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let chunks = splitter(settings)?.split_markdown(&markdown, title.unwrap_or(&stem))?;
    info!(file = %path.display(), chunks = chunks.len(), "split file");
    Ok(chunks)
}

pub fn open_store(config: &Config, settings: &AppConfig) -> Result<DiskStore> {
    let index_dir = resolve_with_base(config.base_dir(), &settings.store.index_dir);
    Ok(DiskStore::open(&index_dir, &settings.store, &settings.embedding)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub failed: usize,
}

/// Split every source document on up to `workers` blocking threads and write
/// the results to the store one document at a time, in source order.
pub fn ingest(config: &Config, settings: &AppConfig, limit: Option<usize>, workers: usize) -> Result<IngestReport> {
    let sources = SourceSet::from_configs(&settings.sources, config.base_dir())?;
    if sources.is_empty() {
        bail!("no sources configured; add a [[sources]] table to config.toml");
    }
    let mut docs = sources.documents()?;
    if let Some(limit) = limit {
        docs.truncate(limit);
    }
    let splitter = Arc::new(splitter(settings)?);
    let store = Arc::new(open_store(config, settings)?);
    info!(documents = docs.len(), workers, "ingesting");

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {msg}")?
        .progress_chars("#>-"));

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let mut splits = stream::iter(docs)
            .map(|doc| {
                let splitter = splitter.clone();
                tokio::task::spawn_blocking(move || {
                    let chunks = doc.read_markdown().and_then(|md| splitter.split_markdown(&md, &doc.title));
                    (doc, chunks)
                })
            })
            .buffered(workers.max(1));

        let mut report = IngestReport::default();
        while let Some(joined) = splits.next().await {
            let (doc, chunks) = joined?;
            pb.set_message(doc.doc_id.clone());
            let stored = match chunks {
                Ok(chunks) => {
                    let store = store.clone();
                    let meta = doc.meta();
                    tokio::task::spawn_blocking(move || store.write(&meta, &chunks)).await?
                }
                Err(e) => Err(e),
            };
            match stored {
                Ok(n) => {
                    report.documents += 1;
                    report.chunks += n;
                }
                Err(e) => {
                    warn!(doc_id = %doc.doc_id, error = %e, "skipped document");
                    report.failed += 1;
                }
            }
            pb.inc(1);
        }
        Ok::<_, anyhow::Error>(report)
    })?;
    pb.finish_with_message("done");
    info!(documents = report.documents, chunks = report.chunks, failed = report.failed, "ingest complete");
    Ok(report)
}

pub fn query(config: &Config, settings: &AppConfig, text: &str, project: Option<String>, top_k: usize) -> Result<Vec<RetrievedChunk>> {
    let store = open_store(config, settings)?;
    Ok(store.search(text, &SearchFilter { project }, top_k)?)
}

/// Run the retrieval gateway until interrupted.
pub fn serve(config: &Config, settings: &AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.gateway.host, settings.gateway.port)
        .parse()
        .with_context(|| format!("invalid gateway address {}:{}", settings.gateway.host, settings.gateway.port))?;
    let store: Arc<dyn ChunkStore> = Arc::new(open_store(config, settings)?);
    let state = GatewayState::new(store, settings.gateway.clone());
    tokio::runtime::Runtime::new()?.block_on(docrag_gateway::serve(state, addr))?;
    Ok(())
}
