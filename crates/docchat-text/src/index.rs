use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tantivy::collector::DocSetCollector;
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexWriter, Searcher, TantivyDocument, Term};
use tracing::{debug, info};

use docchat_core::data_processor::{ChunkingConfig, DataProcessor};
use docchat_core::error::{Error, Result};
use docchat_core::traits::Ingestor;
use docchat_core::types::{IngestedDoc, Meta, FILE_NAME_KEY, PAGE_LABEL_KEY};

use crate::tantivy_utils::{build_schema, register_tokenizer, Fields};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// A stored chunk as read back from the index.
#[derive(Debug, Clone)]
pub(crate) struct ChunkRecord {
	pub doc_id: String,
	pub file_name: String,
	pub page_label: String,
	pub chunk_index: u64,
	pub seq: u64,
	pub text: String,
}

pub struct TantivyStore {
	pub(crate) index: Index,
	pub(crate) fields: Fields,
	data_processor: DataProcessor,
	write_lock: Mutex<()>,
}

impl TantivyStore {
	/// Open the index under `index_dir`, creating it when absent.
	pub fn open(index_dir: &Path, chunking: ChunkingConfig) -> Result<Self> {
		let index = if index_dir.join("meta.json").exists() {
			Index::open_in_dir(index_dir).map_err(Error::ingestion)?
		} else {
			std::fs::create_dir_all(index_dir)?;
			Index::create_in_dir(index_dir, build_schema()).map_err(Error::ingestion)?
		};
		register_tokenizer(&index);
		let fields = Fields::from_schema(&index.schema()).map_err(Error::ingestion)?;
		debug!(dir = %index_dir.display(), "opened document index");
		Ok(Self { index, fields, data_processor: DataProcessor::with_config(chunking), write_lock: Mutex::new(()) })
	}

	fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter) -> Result<T>) -> Result<T> {
		let _guard = self.write_lock.lock().map_err(|_| Error::Operation("index writer lock poisoned".to_string()))?;
		let mut writer: IndexWriter = self.index.writer_with_num_threads(1, WRITER_MEMORY_BYTES).map_err(Error::ingestion)?;
		let out = f(&mut writer)?;
		writer.commit().map_err(Error::ingestion)?;
		Ok(out)
	}

	pub(crate) fn searcher(&self) -> Result<Searcher> {
		Ok(self.index.reader().map_err(Error::retrieval)?.searcher())
	}

	pub(crate) fn read_chunk(&self, doc: &TantivyDocument) -> ChunkRecord {
		let text_of = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let u64_of = |field| doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0);
		ChunkRecord {
			doc_id: text_of(self.fields.doc_id),
			file_name: text_of(self.fields.file_name),
			page_label: text_of(self.fields.page_label),
			chunk_index: u64_of(self.fields.chunk_index),
			seq: u64_of(self.fields.seq),
			text: text_of(self.fields.text),
		}
	}

	/// Every chunk matching `term`, in no particular order.
	pub(crate) fn chunks_by_term(&self, searcher: &Searcher, term: Term) -> Result<Vec<ChunkRecord>> {
		let query = TermQuery::new(term, IndexRecordOption::Basic);
		let addrs = searcher.search(&query, &DocSetCollector).map_err(Error::retrieval)?;
		let mut out = Vec::with_capacity(addrs.len());
		for addr in addrs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(Error::retrieval)?;
			out.push(self.read_chunk(&doc));
		}
		Ok(out)
	}
}

fn make_doc_id(file_name: &str, page_label: &str, seq: u64) -> String {
	let mut hasher = twox_hash::XxHash64::with_seed(0);
	file_name.hash(&mut hasher);
	page_label.hash(&mut hasher);
	seq.hash(&mut hasher);
	format!("{:016x}", hasher.finish())
}

pub(crate) fn unit_metadata(file_name: &str, page_label: &str) -> Meta {
	let mut meta = Meta::new();
	meta.insert(FILE_NAME_KEY.to_string(), file_name.to_string());
	meta.insert(PAGE_LABEL_KEY.to_string(), page_label.to_string());
	meta
}

impl Ingestor for TantivyStore {
	fn list_ingested(&self) -> Result<Vec<IngestedDoc>> {
		let searcher = self.searcher()?;
		let firsts = self.chunks_by_term(&searcher, Term::from_field_u64(self.fields.chunk_index, 0))?;
		let ordered: BTreeMap<(u64, String), ChunkRecord> = firsts.into_iter().map(|c| ((c.seq, c.doc_id.clone()), c)).collect();
		Ok(ordered
			.into_values()
			.map(|c| IngestedDoc { doc_metadata: Some(unit_metadata(&c.file_name, &c.page_label)), doc_id: c.doc_id })
			.collect())
	}

	fn delete(&self, doc_id: &str) -> Result<()> {
		self.with_writer(|writer| {
			writer.delete_term(Term::from_field_text(self.fields.doc_id, doc_id));
			Ok(())
		})?;
		info!(doc_id, "deleted ingested document");
		Ok(())
	}

	fn bulk_ingest(&self, files: &[(String, PathBuf)]) -> Result<Vec<IngestedDoc>> {
		let base_seq = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0);
		let mut parsed = Vec::with_capacity(files.len());
		for (file_name, path) in files {
			let pages = self.data_processor.process_file(path).map_err(|e| Error::Ingestion(format!("{}: {}", path.display(), e)))?;
			parsed.push((file_name, pages));
		}
		self.with_writer(|writer| {
			let mut ingested = Vec::new();
			let mut seq = base_seq;
			for (file_name, pages) in &parsed {
				info!(file = %file_name, pages = pages.len(), "ingesting file");
				for page in pages {
					let doc_id = make_doc_id(file_name, &page.page_label, seq);
					for (chunk_index, chunk) in page.chunks.iter().enumerate() {
						writer.add_document(doc!(
							self.fields.id => format!("{}:{}", doc_id, chunk_index),
							self.fields.doc_id => doc_id.clone(),
							self.fields.file_name => file_name.to_string(),
							self.fields.page_label => page.page_label.clone(),
							self.fields.chunk_index => chunk_index as u64,
							self.fields.seq => seq,
							self.fields.text => chunk.clone(),
						)).map_err(Error::ingestion)?;
					}
					ingested.push(IngestedDoc { doc_metadata: Some(unit_metadata(file_name, &page.page_label)), doc_id });
					seq += 1;
				}
			}
			Ok(ingested)
		})
	}
}
