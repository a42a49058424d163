use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Searcher, TantivyDocument, Term};
use tracing::{debug, warn};

use docchat_core::error::{Error, Result};
use docchat_core::traits::Retriever;
use docchat_core::types::{IngestedDoc, RetrievedPassage, ScopeFilter};

use crate::index::{unit_metadata, ChunkRecord, TantivyStore};

impl TantivyStore {
	fn scoped_query(&self, query: Box<dyn Query>, filter: &ScopeFilter) -> Box<dyn Query> {
		let scope: Vec<(Occur, Box<dyn Query>)> = filter
			.doc_ids
			.iter()
			.map(|id| {
				let term = Term::from_field_text(self.fields.doc_id, id);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>)
			})
			.collect();
		let scope: Box<dyn Query> = Box::new(BooleanQuery::new(scope));
		Box::new(BooleanQuery::new(vec![(Occur::Must, query), (Occur::Must, scope)]))
	}

	/// Join `hit` with up to `window` neighbouring chunks of the same unit on each side.
	fn expand_adjacent(&self, searcher: &Searcher, hit: &ChunkRecord, window: usize) -> Result<String> {
		let lo = hit.chunk_index.saturating_sub(window as u64);
		let hi = hit.chunk_index.saturating_add(window as u64);
		let mut neighbours: Vec<ChunkRecord> = self
			.chunks_by_term(searcher, Term::from_field_text(self.fields.doc_id, &hit.doc_id))?
			.into_iter()
			.filter(|c| (lo..=hi).contains(&c.chunk_index))
			.collect();
		neighbours.sort_by_key(|c| c.chunk_index);
		Ok(neighbours.into_iter().map(|c| c.text).collect::<Vec<_>>().join("\n\n"))
	}
}

impl Retriever for TantivyStore {
	fn retrieve_relevant(
		&self,
		text: &str,
		limit: usize,
		prev_next_chunks: usize,
		filter: Option<&ScopeFilter>,
	) -> Result<Vec<RetrievedPassage>> {
		if let Some(f) = filter {
			if f.is_empty() {
				warn!("scope filter has no document ids; retrieval returns nothing");
				return Ok(vec![]);
			}
		}
		if limit == 0 { return Ok(vec![]); }

		let searcher = self.searcher()?;
		let qp = QueryParser::for_index(&self.index, vec![self.fields.text]);
		let (query, errors) = qp.parse_query_lenient(text);
		if !errors.is_empty() { debug!(errors = errors.len(), "lenient query parse dropped clauses"); }
		let query = match filter {
			Some(f) => self.scoped_query(query, f),
			None => query,
		};

		let top_docs = searcher.search(query.as_ref(), &TopDocs::with_limit(limit)).map_err(Error::retrieval)?;
		let mut passages = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(Error::retrieval)?;
			let hit = self.read_chunk(&doc);
			let text = if prev_next_chunks > 0 { self.expand_adjacent(&searcher, &hit, prev_next_chunks)? } else { hit.text.clone() };
			passages.push(RetrievedPassage {
				document: IngestedDoc { doc_metadata: Some(unit_metadata(&hit.file_name, &hit.page_label)), doc_id: hit.doc_id },
				text,
				score,
			});
		}
		debug!(query = text, hits = passages.len(), "retrieved passages");
		Ok(passages)
	}
}
