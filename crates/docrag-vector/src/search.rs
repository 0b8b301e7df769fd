use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;
use tracing::debug;

use docrag_core::error::{Error, Result};
use docrag_core::traits::VectorIndexer;
use docrag_core::types::{DocumentChunk, SearchFilter, SearchHit, SourceKind};

use crate::table::sql_literal;
use crate::writer::LanceVectorIndexer;

impl LanceVectorIndexer {
	async fn nearest(&self, query_vec: &[f32], filter: &SearchFilter, k: usize) -> Result<Vec<SearchHit>> {
		if self.table.count_rows(None).await.map_err(Error::index)? == 0 { return Ok(vec![]); }
		let mut query = self.table.vector_search(query_vec.to_vec()).map_err(Error::index)?
			.distance_type(DistanceType::Cosine)
			.limit(k);
		if let Some(project) = filter.project.as_deref() {
			query = query.only_if(format!("doc_project = {}", sql_literal(project)));
		}
		let batches: Vec<RecordBatch> = query.execute().await.map_err(Error::index)?
			.try_collect().await.map_err(Error::index)?;
		let mut hits = Vec::new();
		for batch in &batches {
			let ids = column::<StringArray>(batch, "id")?;
			let distances = column::<Float32Array>(batch, "_distance")?;
			for i in 0..batch.num_rows() {
				hits.push(SearchHit { id: ids.value(i).to_string(), score: 1.0 - distances.value(i), source: SourceKind::Vector });
			}
		}
		Ok(hits)
	}
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::Index(format!("vector result column '{}' missing", name)))
}

impl VectorIndexer for LanceVectorIndexer {
	fn index(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
		self.block_on(self.insert(chunks, embeddings))
	}

	fn delete_doc(&self, doc_id: &str) -> Result<()> {
		self.block_on(self.delete(doc_id))
	}

	fn replace_doc(&self, doc_id: &str, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
		self.block_on(async {
			self.delete(doc_id).await?;
			self.insert(chunks, embeddings).await
		})
	}

	fn search_vec(&self, query_vec: &[f32], filter: &SearchFilter, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 { return Ok(vec![]); }
		if query_vec.len() != self.dim {
			return Err(Error::Embedding(format!("query vector has {} dimensions, index has {}", query_vec.len(), self.dim)));
		}
		let hits = self.block_on(self.nearest(query_vec, filter, k))?;
		debug!(hits = hits.len(), "vector search");
		Ok(hits)
	}
}
