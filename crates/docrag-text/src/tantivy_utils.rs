use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, StopWordFilter, TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::Index;

pub const MIXED_TOKENIZER: &str = "docrag_mixed";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(MIXED_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("id", STRING | STORED);
	schema_builder.add_text_field("doc_id", STRING | STORED);
	schema_builder.add_text_field("doc_title", text_options.clone());
	schema_builder.add_text_field("doc_project", STRING | STORED);
	schema_builder.add_text_field("doc_url", STORED);
	schema_builder.add_text_field("body", text_options);
	schema_builder.add_u64_field("chunk_index", STORED);
	schema_builder.add_u64_field("total_chunks", STORED);
	schema_builder.build()
}

pub fn mixed_analyzer() -> TextAnalyzer {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	TextAnalyzer::builder(MixedScriptTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build()
}

pub fn register_tokenizer(index: &Index) {
	index.tokenizers().register(MIXED_TOKENIZER, mixed_analyzer());
}

/// Splits ASCII letters/digits into words and other scripts into overlapping
/// character bigrams (a lone character stays a unigram).
#[derive(Clone, Default)]
pub struct MixedScriptTokenizer {
	tokens: Vec<Token>,
}

pub struct MixedScriptStream<'a> {
	tokens: &'a mut Vec<Token>,
	next: usize,
}

impl Tokenizer for MixedScriptTokenizer {
	type TokenStream<'a> = MixedScriptStream<'a>;

	fn token_stream<'a>(&'a mut self, text: &'a str) -> MixedScriptStream<'a> {
		self.tokens.clear();
		tokenize_into(text, &mut self.tokens);
		MixedScriptStream { tokens: &mut self.tokens, next: 0 }
	}
}

impl TokenStream for MixedScriptStream<'_> {
	fn advance(&mut self) -> bool {
		if self.next < self.tokens.len() { self.next += 1; true } else { false }
	}

	fn token(&self) -> &Token { &self.tokens[self.next.saturating_sub(1)] }

	fn token_mut(&mut self) -> &mut Token { &mut self.tokens[self.next.saturating_sub(1)] }
}

fn tokenize_into(text: &str, out: &mut Vec<Token>) {
	let mut word_start: Option<usize> = None;
	let mut run: Vec<(usize, char)> = Vec::new();
	for (offset, c) in text.char_indices() {
		if c.is_ascii_alphanumeric() {
			flush_run(&mut run, out);
			word_start.get_or_insert(offset);
			continue;
		}
		if let Some(start) = word_start.take() { push(out, start, offset, &text[start..offset]); }
		if c.is_alphanumeric() { run.push((offset, c)); } else { flush_run(&mut run, out); }
	}
	if let Some(start) = word_start { push(out, start, text.len(), &text[start..]); }
	flush_run(&mut run, out);
}

fn flush_run(run: &mut Vec<(usize, char)>, out: &mut Vec<Token>) {
	match run.len() {
		0 => {}
		1 => { let (o, c) = run[0]; push(out, o, o + c.len_utf8(), &c.to_string()); }
		_ => {
			for pair in run.windows(2) {
				let ((o1, c1), (o2, c2)) = (pair[0], pair[1]);
				push(out, o1, o2 + c2.len_utf8(), &format!("{c1}{c2}"));
			}
		}
	}
	run.clear();
}

fn push(out: &mut Vec<Token>, from: usize, to: usize, text: &str) {
	let position = out.len();
	out.push(Token { offset_from: from, offset_to: to, position, text: text.to_string(), position_length: 1 });
}

#[cfg(test)]
mod tests {
	use super::*;

	fn terms(text: &str) -> Vec<String> {
		let mut analyzer = mixed_analyzer();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		while stream.advance() { out.push(stream.token().text.clone()); }
		out
	}

	#[test]
	fn splits_mixed_scripts() {
		assert_eq!(terms("坐骑系统"), vec!["坐骑", "骑系", "系统"]);
		assert_eq!(terms("The Maven 依赖"), vec!["maven", "依赖"]);
		assert_eq!(terms("pom.xml中添加"), vec!["pom", "xml", "中添", "添加"]);
		assert_eq!(terms("中 国"), vec!["中", "国"]);
		assert!(terms("  !! ").is_empty());
	}
}
