use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::num::TryFromIntError;

/// Occurrence statistics for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    per_document_frequency: BTreeMap<String, u32>,
    total_term_frequency: u32,
    total_document_frequency: u32,
}

impl Posting {
    pub fn new() -> Self { Self::default() }

    /// Rebuild a posting from stored parts. The document frequency is taken
    /// from the map so the two can never disagree.
    pub fn from_parts(per_document_frequency: BTreeMap<String, u32>, total_term_frequency: u32) -> Self {
        let total_document_frequency = per_document_frequency.len() as u32;
        Self { per_document_frequency, total_term_frequency, total_document_frequency }
    }

    /// Count one more occurrence of the term in `doc_id`.
    pub fn record(&mut self, doc_id: &str) {
        match self.per_document_frequency.get_mut(doc_id) {
            Some(freq) => *freq += 1,
            None => {
                self.per_document_frequency.insert(doc_id.to_string(), 1);
            }
        }
        self.total_term_frequency += 1;
        self.total_document_frequency = self.per_document_frequency.len() as u32;
    }

    /// Replace the per-document counts. Both totals are recomputed from the
    /// new map; there are no setters for them on their own. Fails, leaving the
    /// posting untouched, if the counts sum past `u32::MAX`.
    pub fn set_per_document_frequency(&mut self, per_document_frequency: BTreeMap<String, u32>) -> Result<(), TryFromIntError> {
        let summed: u64 = per_document_frequency.values().map(|&f| u64::from(f)).sum();
        self.total_term_frequency = u32::try_from(summed)?;
        self.total_document_frequency = per_document_frequency.len() as u32;
        self.per_document_frequency = per_document_frequency;
        Ok(())
    }

    pub fn per_document_frequency(&self) -> &BTreeMap<String, u32> { &self.per_document_frequency }
    pub fn total_term_frequency(&self) -> u32 { self.total_term_frequency }
    pub fn total_document_frequency(&self) -> u32 { self.total_document_frequency }

    /// Higher total term frequency sorts first.
    pub fn cmp_by_frequency(&self, other: &Self) -> Ordering {
        other.total_term_frequency.cmp(&self.total_term_frequency)
    }
}
