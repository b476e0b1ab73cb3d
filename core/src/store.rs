//! Line-oriented text encoding of the term map.
//!
//! Each term occupies one line:
//!
//! ```text
//! <term>=<doc_1>|...|<doc_n>@<freq_1>|...|<freq_n>@<total_term_frequency>@<total_document_frequency>
//! ```
//!
//! No escaping is defined. Terms and document IDs must not contain any of
//! [`RESERVED`], and a term must not start with whitespace or a properties
//! comment marker (`#`, `!`); the builder refuses them before they reach
//! this module.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};
use crate::posting::Posting;

pub const INDEX_FILE: &str = "indexFile.properties";
pub const RESERVED: &[char] = &['=', '@', '|', '\n', '\r'];

const KEY_SEP: char = '=';
const SEGMENT_SEP: char = '@';
const LIST_SEP: char = '|';

const COMMENT_MARKERS: &[char] = &['#', '!'];

/// Whether `s` can appear as a document ID.
pub fn is_encodable(s: &str) -> bool { !s.contains(RESERVED) }

/// Whether `s` can start an entry line without being read back as a comment or blank line.
pub fn is_encodable_term(s: &str) -> bool {
    match s.chars().next() {
        None => false,
        Some(c) if c.is_whitespace() || COMMENT_MARKERS.contains(&c) => false,
        Some(_) => is_encodable(s),
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_file(&self) -> PathBuf { self.root.join(INDEX_FILE) }
    fn staging_file(&self) -> PathBuf { self.root.join(format!("{INDEX_FILE}.tmp")) }
}

pub fn encode_entry(term: &str, posting: &Posting) -> String {
    let docs = posting.per_document_frequency();
    let ids: Vec<&str> = docs.keys().map(|k| k.as_str()).collect();
    let freqs: Vec<String> = docs.values().map(|f| f.to_string()).collect();
    format!(
        "{term}{KEY_SEP}{}{SEGMENT_SEP}{}{SEGMENT_SEP}{}{SEGMENT_SEP}{}",
        ids.join("|"),
        freqs.join("|"),
        posting.total_term_frequency(),
        posting.total_document_frequency()
    )
}

/// Decode one entry. `line_no` is only used for error reporting.
pub fn decode_entry(line: &str, line_no: usize) -> Result<(String, Posting)> {
    let malformed = |reason: String| IndexError::Malformed { line: line_no, reason };

    let (term, value) = line
        .split_once(KEY_SEP)
        .ok_or_else(|| malformed(format!("missing '{KEY_SEP}'")))?;
    if term.is_empty() {
        return Err(malformed("empty term".into()));
    }
    let segments: Vec<&str> = value.split(SEGMENT_SEP).collect();
    if segments.len() != 4 {
        return Err(malformed(format!("expected 4 segments, found {}", segments.len())));
    }

    let ids: Vec<&str> = segments[0].split(LIST_SEP).collect();
    let freqs: Vec<&str> = segments[1].split(LIST_SEP).collect();
    if ids.len() != freqs.len() {
        return Err(malformed(format!("{} document ids but {} frequencies", ids.len(), freqs.len())));
    }

    let mut per_document_frequency = BTreeMap::new();
    for (id, freq) in ids.into_iter().zip(freqs) {
        let freq: u32 = freq.parse().map_err(|_| malformed(format!("bad frequency {freq:?}")))?;
        if freq == 0 {
            return Err(malformed(format!("zero frequency for document {id:?}")));
        }
        if per_document_frequency.insert(id.to_string(), freq).is_some() {
            return Err(malformed(format!("duplicate document id {id:?}")));
        }
    }

    let total_term_frequency: u32 = segments[2]
        .parse()
        .map_err(|_| malformed(format!("bad total term frequency {:?}", segments[2])))?;
    let total_document_frequency: usize = segments[3]
        .parse()
        .map_err(|_| malformed(format!("bad total document frequency {:?}", segments[3])))?;
    if total_document_frequency != per_document_frequency.len() {
        return Err(malformed(format!(
            "document frequency {total_document_frequency} does not match {} document ids",
            per_document_frequency.len()
        )));
    }
    let summed: u64 = per_document_frequency.values().map(|&f| u64::from(f)).sum();
    if summed != u64::from(total_term_frequency) {
        return Err(malformed(format!(
            "total term frequency {total_term_frequency} does not match summed frequencies {summed}"
        )));
    }

    Ok((term.to_string(), Posting::from_parts(per_document_frequency, total_term_frequency)))
}

/// Write the whole map, replacing any previous index file only once the new
/// one is completely on disk.
pub fn save_index(paths: &IndexPaths, terms: &BTreeMap<String, Posting>) -> Result<()> {
    let build_err = |path: PathBuf| move |source| IndexError::Build { path, source };

    fs::create_dir_all(&paths.root).map_err(build_err(paths.root.clone()))?;
    let staging = paths.staging_file();
    let f = File::create(&staging).map_err(build_err(staging.clone()))?;
    let mut out = BufWriter::new(f);
    for (term, posting) in terms {
        writeln!(out, "{}", encode_entry(term, posting)).map_err(build_err(staging.clone()))?;
    }
    let f = out.into_inner().map_err(|e| IndexError::Build { path: staging.clone(), source: e.into_error() })?;
    f.sync_all().map_err(build_err(staging.clone()))?;
    drop(f);

    let target = paths.index_file();
    fs::rename(&staging, &target).map_err(build_err(target.clone()))?;
    Ok(())
}

fn is_skippable(line: &str) -> bool {
    let line = line.trim_start();
    line.is_empty() || line.starts_with(COMMENT_MARKERS)
}

/// Load every entry, failing on the first unreadable or malformed line.
pub fn load_index(paths: &IndexPaths) -> Result<BTreeMap<String, Posting>> {
    let mut terms = BTreeMap::new();
    for_each_entry(paths, |entry| {
        let (term, posting) = entry?;
        terms.insert(term, posting);
        Ok(())
    })?;
    Ok(terms)
}

/// Feed every decoded entry to `visit`. Errors returned by `visit` stop the scan.
pub fn for_each_entry<F>(paths: &IndexPaths, mut visit: F) -> Result<()>
where
    F: FnMut(Result<(String, Posting)>) -> Result<()>,
{
    let path = paths.index_file();
    let f = File::open(&path).map_err(|source| IndexError::Load { path: path.clone(), source })?;
    for (idx, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(|source| IndexError::Load { path: path.clone(), source })?;
        if is_skippable(&line) {
            continue;
        }
        visit(decode_entry(&line, idx + 1))?;
    }
    Ok(())
}
