use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{IndexError, Result};
use crate::posting::Posting;
use crate::store::{self, IndexPaths};

/// Read-only, fully in-memory view of a persisted index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReader {
    terms: BTreeMap<String, Posting>,
}

impl IndexReader {
    /// Load the index under `root`, logging rather than returning failures.
    ///
    /// Malformed entries are skipped; a missing or unreadable file leaves the
    /// reader with whatever was read before the failure. Check [`is_empty`](Self::is_empty)
    /// before trusting the result.
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        let paths = IndexPaths::new(root);
        let mut terms = BTreeMap::new();
        let mut skipped = 0usize;
        let scan = store::for_each_entry(&paths, |entry| {
            match entry {
                Ok((term, posting)) => {
                    terms.insert(term, posting);
                }
                Err(err) => {
                    warn!(error = %err, "skipping index entry");
                    skipped += 1;
                }
            }
            Ok(())
        });
        if let Err(err) = scan {
            error!(error = %err, "index could not be fully loaded");
        }
        info!(num_terms = terms.len(), skipped, "index loaded");
        Self { terms }
    }

    /// Load the index under `root`, failing on the first unreadable or malformed entry.
    pub fn try_open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let terms = store::load_index(&IndexPaths::new(root))?;
        info!(num_terms = terms.len(), "index loaded");
        Ok(Self { terms })
    }

    pub fn from_terms(terms: BTreeMap<String, Posting>) -> Self { Self { terms } }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Number of distinct terms.
    pub fn total_key_terms(&self) -> usize { self.terms.len() }

    /// Number of distinct document IDs across all postings.
    pub fn total_value_terms(&self) -> usize {
        self.terms
            .values()
            .flat_map(|p| p.per_document_frequency().keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Document → occurrence count for an already-normalized term.
    pub fn get_postings(&self, term: &str) -> Option<&BTreeMap<String, u32>> {
        self.terms.get(term).map(|p| p.per_document_frequency())
    }

    pub fn posting(&self, term: &str) -> Option<&Posting> { self.terms.get(term) }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &Posting)> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }

    /// Up to `k` terms by descending total frequency. Equal frequencies are
    /// ordered by term so that no term is lost to a tie.
    pub fn top_k(&self, k: usize) -> Option<Vec<&str>> {
        if k == 0 || self.terms.is_empty() {
            return None;
        }
        let mut ranked: Vec<(&String, &Posting)> = self.terms.iter().collect();
        ranked.sort_by(|a, b| a.1.cmp_by_frequency(b.1).then_with(|| a.0.cmp(b.0)));
        Some(ranked.into_iter().take(k).map(|(t, _)| t.as_str()).collect())
    }

    /// Boolean AND over `terms`: documents containing every term, with the
    /// occurrence counts of all terms summed per document. Sums are widened to
    /// `u64` since each addend may already be near `u32::MAX`.
    pub fn query<S: AsRef<str>>(&self, terms: &[S]) -> Result<BTreeMap<String, u64>> {
        let lists = terms
            .iter()
            .map(|t| {
                let t = t.as_ref();
                self.get_postings(t).ok_or_else(|| IndexError::UnknownTerm(t.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let (first, rest) = lists.split_first().ok_or(IndexError::EmptyQuery)?;
        let hits: BTreeMap<String, u64> = first
            .iter()
            .filter_map(|(doc, freq)| {
                rest.iter()
                    .try_fold(u64::from(*freq), |sum, list| list.get(doc).map(|&f| sum + u64::from(f)))
                    .map(|sum| (doc.clone(), sum))
            })
            .collect();

        if hits.is_empty() {
            return Err(IndexError::NoMatches);
        }
        Ok(hits)
    }
}
