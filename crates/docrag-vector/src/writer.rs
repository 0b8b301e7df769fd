use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Table;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use docrag_core::error::{Error, Result};
use docrag_core::types::DocumentChunk;

use crate::schema::build_arrow_schema;
use crate::table::{ensure_table, open_db, sql_literal};

/// Chunk embeddings in an embedded LanceDB table.
///
/// LanceDB is async only; the indexer owns a small runtime and blocks on it,
/// so its methods must not be called from inside an async task (use
/// `spawn_blocking`).
pub struct LanceVectorIndexer {
	runtime: Option<Runtime>,
	pub(crate) table: Table,
	pub(crate) dim: usize,
}

impl LanceVectorIndexer {
	/// Open (or create) `table_name` in the database at `db_dir`.
	pub fn open(db_dir: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let width = i32::try_from(dim).ok().filter(|d| *d > 0)
			.ok_or_else(|| Error::InvalidConfig(format!("unsupported vector dimension {}", dim)))?;
		std::fs::create_dir_all(db_dir)?;
		let runtime = Builder::new_multi_thread().worker_threads(2).thread_name("docrag-lance").enable_all().build()?;
		let uri = db_dir.to_string_lossy().to_string();
		let table = runtime.block_on(async {
			let conn = open_db(&uri).await?;
			ensure_table(&conn, table_name, width).await
		})?;
		info!(db = %uri, table = table_name, dim, "opened vector table");
		Ok(Self { runtime: Some(runtime), table, dim })
	}

	pub fn dim(&self) -> usize { self.dim }

	pub fn num_chunks(&self) -> Result<usize> {
		self.block_on(async { self.table.count_rows(None).await.map_err(Error::index) })
	}

	pub(crate) fn block_on<F: Future<Output = Result<T>>, T>(&self, fut: F) -> Result<T> {
		let runtime = self.runtime.as_ref().ok_or_else(|| Error::Operation("vector runtime shut down".into()))?;
		runtime.block_on(fut)
	}

	pub(crate) async fn insert(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
		if chunks.is_empty() { return Ok(()); }
		let record_batch = self.to_record_batch(chunks, embeddings)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		self.table.add(reader).execute().await.map_err(Error::index)?;
		debug!(rows = chunks.len(), "appended vectors");
		Ok(())
	}

	pub(crate) async fn delete(&self, doc_id: &str) -> Result<()> {
		self.table.delete(&format!("doc_id = {}", sql_literal(doc_id))).await.map_err(Error::index)?;
		Ok(())
	}

	fn to_record_batch(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
		if chunks.len() != embeddings.len() {
			return Err(Error::Embedding(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
		}
		if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim) {
			return Err(Error::Embedding(format!("expected {}-dimensional vectors, got {}", self.dim, bad.len())));
		}
		let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
		let doc_ids: Vec<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();
		let projects: Vec<&str> = chunks.iter().map(|c| c.doc_project.as_str()).collect();
		let vectors = embeddings.iter().map(|e| Some(e.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
		let schema = build_arrow_schema(self.dim as i32);
		RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(doc_ids)),
			Arc::new(StringArray::from(projects)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, self.dim as i32)),
		]).map_err(Error::index)
	}
}

impl Drop for LanceVectorIndexer {
	fn drop(&mut self) {
		// Dropping a runtime blocks, which panics inside async contexts.
		if let Some(runtime) = self.runtime.take() { runtime.shutdown_background(); }
	}
}
