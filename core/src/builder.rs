use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::analysis::Pipeline;
use crate::document::{Document, FieldName};
use crate::error::{IndexError, Result};
use crate::posting::Posting;
use crate::store::{self, IndexPaths};
use crate::tokenizer::TokenStream;

/// Accumulates postings for one build session and writes them out on [`close`](Self::close).
pub struct IndexBuilder {
    paths: IndexPaths,
    pipeline: Pipeline,
    terms: BTreeMap<String, Posting>,
    documents_indexed: usize,
}

impl IndexBuilder {
    pub fn new<P: AsRef<Path>>(root: P, pipeline: Pipeline) -> Self {
        Self { paths: IndexPaths::new(root), pipeline, terms: BTreeMap::new(), documents_indexed: 0 }
    }

    pub fn standard<P: AsRef<Path>>(root: P) -> Self { Self::new(root, Pipeline::standard()) }

    /// Index every indexable field of `doc` under its FILEID.
    ///
    /// Field values the tokenizer rejects are logged and skipped; only a
    /// missing or unencodable document ID rejects the whole document.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        let doc_id = doc.id().ok_or(IndexError::MissingDocumentId)?;
        if !store::is_encodable(doc_id) {
            return Err(IndexError::InvalidDocumentId(doc_id.to_string()));
        }

        if let Some(title) = doc.get_field(FieldName::Title).and_then(|v| v.first()) {
            self.index_value(FieldName::Title, title, doc_id, true);
        }

        for field in FieldName::INDEXED {
            let Some(values) = doc.get_field(field) else { continue };
            for value in values {
                self.index_value(field, value, doc_id, false);
            }
        }

        self.documents_indexed += 1;
        Ok(())
    }

    fn index_value(&mut self, field: FieldName, value: &str, doc_id: &str, title: bool) {
        match self.pipeline.analyze(field, value, title) {
            Ok(stream) => self.fold(stream, doc_id),
            Err(err) => warn!(doc_id, %field, error = %err, "dropping field value"),
        }
    }

    fn fold(&mut self, mut stream: TokenStream, doc_id: &str) {
        while let Some(token) = stream.advance() {
            let term = token.to_string();
            if !store::is_encodable_term(&term) {
                debug!(doc_id, term = %term, "skipping unencodable term");
                continue;
            }
            self.terms.entry(term).or_default().record(doc_id);
        }
    }

    pub fn terms(&self) -> &BTreeMap<String, Posting> { &self.terms }
    pub fn posting(&self, term: &str) -> Option<&Posting> { self.terms.get(term) }
    pub fn documents_indexed(&self) -> usize { self.documents_indexed }

    /// Persist the index. Consumes the builder, so no document can be added afterwards.
    pub fn close(self) -> Result<()> {
        store::save_index(&self.paths, &self.terms)?;
        info!(
            num_docs = self.documents_indexed,
            num_terms = self.terms.len(),
            path = %self.paths.index_file().display(),
            "index build complete"
        );
        Ok(())
    }
}
