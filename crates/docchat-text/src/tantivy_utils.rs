use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, INDEXED, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "text_with_stopwords";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _id_field = schema_builder.add_text_field("id", STRING | STORED);
	let _doc_id_field = schema_builder.add_text_field("doc_id", STRING | STORED);
	let _file_name_field = schema_builder.add_text_field("file_name", STRING | STORED);
	let _page_label_field = schema_builder.add_text_field("page_label", STRING | STORED);
	let _chunk_index_field = schema_builder.add_u64_field("chunk_index", INDEXED | STORED);
	let _seq_field = schema_builder.add_u64_field("seq", STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	let _text_field = schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

/// Field handles resolved once per opened index.
#[derive(Debug, Clone, Copy)]
pub struct Fields {
	pub id: Field,
	pub doc_id: Field,
	pub file_name: Field,
	pub page_label: Field,
	pub chunk_index: Field,
	pub seq: Field,
	pub text: Field,
}

impl Fields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field("id")?,
			doc_id: schema.get_field("doc_id")?,
			file_name: schema.get_field("file_name")?,
			page_label: schema.get_field("page_label")?,
			chunk_index: schema.get_field("chunk_index")?,
			seq: schema.get_field("seq")?,
			text: schema.get_field("text")?,
		})
	}
}
