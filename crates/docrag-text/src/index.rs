use std::path::Path;
use std::sync::Mutex;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use docrag_core::error::{Error, Result};
use docrag_core::traits::TextIndexer;
use docrag_core::types::{DocumentChunk, SearchFilter, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, MIXED_TOKENIZER};

const WRITER_MEMORY: usize = 50_000_000;

struct Fields {
	id: Field,
	doc_id: Field,
	doc_title: Field,
	doc_project: Field,
	doc_url: Field,
	body: Field,
	chunk_index: Field,
	total_chunks: Field,
}

/// BM25 keyword index over chunk bodies and document titles.
///
/// The writer (and its directory lock) is only taken on the first write, so
/// read-only users such as the gateway can share the directory with an
/// ingesting process.
pub struct TantivyIndexer {
	index: Index,
	reader: IndexReader,
	writer: Mutex<Option<IndexWriter>>,
	fields: Fields,
}

impl TantivyIndexer {
	/// Open the index under `index_dir`, creating it when missing.
	pub fn open_or_create(index_dir: &Path) -> Result<Self> {
		std::fs::create_dir_all(index_dir)?;
		let dir = MmapDirectory::open(index_dir).map_err(Error::index)?;
		let index = Index::open_or_create(dir, build_schema()).map_err(Error::index)?;
		register_tokenizer(&index);
		let schema = index.schema();
		let field = |name: &str| schema.get_field(name).map_err(Error::index);
		let fields = Fields {
			id: field("id")?,
			doc_id: field("doc_id")?,
			doc_title: field("doc_title")?,
			doc_project: field("doc_project")?,
			doc_url: field("doc_url")?,
			body: field("body")?,
			chunk_index: field("chunk_index")?,
			total_chunks: field("total_chunks")?,
		};
		let reader = index.reader_builder().reload_policy(ReloadPolicy::OnCommitWithDelay).try_into().map_err(Error::index)?;
		Ok(Self { index, reader, writer: Mutex::new(None), fields })
	}

	pub fn num_chunks(&self) -> u64 { self.reader.searcher().num_docs() }

	fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter) -> tantivy::Result<T>) -> Result<T> {
		let mut guard = self.writer.lock().map_err(|_| Error::Operation("text index writer poisoned".into()))?;
		if guard.is_none() {
			*guard = Some(self.index.writer(WRITER_MEMORY).map_err(Error::index)?);
		}
		let Some(writer) = guard.as_mut() else { return Err(Error::Operation("text index writer unavailable".into())) };
		let out = f(writer).map_err(Error::index)?;
		writer.commit().map_err(Error::index)?;
		self.reader.reload().map_err(Error::index)?;
		Ok(out)
	}

	fn add_chunks(&self, writer: &mut IndexWriter, chunks: &[DocumentChunk]) -> tantivy::Result<()> {
		let f = &self.fields;
		for c in chunks {
			writer.add_document(doc!(
				f.id => c.id.clone(),
				f.doc_id => c.doc_id.clone(),
				f.doc_title => c.doc_title.clone(),
				f.doc_project => c.doc_project.clone(),
				f.doc_url => c.doc_url.clone(),
				f.body => c.content.clone(),
				f.chunk_index => c.chunk_index as u64,
				f.total_chunks => c.total_chunks as u64,
			))?;
		}
		Ok(())
	}

	fn keyword_query(&self, query: &str) -> Result<Option<Box<dyn Query>>> {
		let mut analyzer = self.index.tokenizers().get(MIXED_TOKENIZER)
			.ok_or_else(|| Error::Index(format!("tokenizer {} not registered", MIXED_TOKENIZER)))?;
		let mut terms = Vec::new();
		let mut stream = analyzer.token_stream(query);
		while stream.advance() {
			let text = stream.token().text.clone();
			if !terms.contains(&text) { terms.push(text); }
		}
		if terms.is_empty() { return Ok(None); }
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(terms.len() * 2);
		for t in &terms {
			for field in [self.fields.body, self.fields.doc_title] {
				let term_query: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(field, t), IndexRecordOption::WithFreqs));
				clauses.push((Occur::Should, term_query));
			}
		}
		let q: Box<dyn Query> = Box::new(BooleanQuery::new(clauses));
		Ok(Some(q))
	}

	fn to_chunk(&self, doc: &TantivyDocument) -> DocumentChunk {
		let f = &self.fields;
		let text = |field: Field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let number = |field: Field| doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
		DocumentChunk {
			id: text(f.id),
			doc_id: text(f.doc_id),
			doc_title: text(f.doc_title),
			doc_project: text(f.doc_project),
			doc_url: text(f.doc_url),
			content: text(f.body),
			chunk_index: number(f.chunk_index),
			total_chunks: number(f.total_chunks),
		}
	}
}

impl TextIndexer for TantivyIndexer {
	fn index(&self, chunks: &[DocumentChunk]) -> Result<()> {
		self.with_writer(|w| self.add_chunks(w, chunks))
	}

	fn delete_doc(&self, doc_id: &str) -> Result<()> {
		let term = Term::from_field_text(self.fields.doc_id, doc_id);
		self.with_writer(|w| { w.delete_term(term); Ok(()) })
	}

	/// Delete and add under a single commit, so readers never see a half-replaced document.
	fn replace_doc(&self, doc_id: &str, chunks: &[DocumentChunk]) -> Result<()> {
		let term = Term::from_field_text(self.fields.doc_id, doc_id);
		self.with_writer(|w| { w.delete_term(term); self.add_chunks(w, chunks) })
	}

	fn search(&self, query: &str, filter: &SearchFilter, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 { return Ok(vec![]); }
		let Some(keywords) = self.keyword_query(query)? else { return Ok(vec![]) };
		let q: Box<dyn Query> = match filter.project.as_deref() {
			Some(project) => {
				let by_project: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(self.fields.doc_project, project), IndexRecordOption::Basic));
				Box::new(BooleanQuery::new(vec![(Occur::Must, keywords), (Occur::Must, by_project)]))
			}
			None => keywords,
		};
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&*q, &TopDocs::with_limit(k)).map_err(Error::index)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(Error::index)?;
			let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or("").to_string();
			hits.push(SearchHit { id, score, source: SourceKind::Text });
		}
		debug!(hits = hits.len(), "keyword search");
		Ok(hits)
	}

	fn get(&self, id: &str) -> Result<Option<DocumentChunk>> {
		let searcher = self.reader.searcher();
		let q = TermQuery::new(Term::from_field_text(self.fields.id, id), IndexRecordOption::Basic);
		let top = searcher.search(&q, &TopDocs::with_limit(1)).map_err(Error::index)?;
		let Some((_, addr)) = top.into_iter().next() else { return Ok(None) };
		let doc: TantivyDocument = searcher.doc(addr).map_err(Error::index)?;
		Ok(Some(self.to_chunk(&doc)))
	}
}
