use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("tokenizer rejected input: {0}")]
    Tokenize(String),

    #[error("document has no FILEID value")]
    MissingDocumentId,

    #[error("document id {0:?} contains a reserved delimiter")]
    InvalidDocumentId(String),

    #[error("failed to write index at {}: {source}", .path.display())]
    Build {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read index at {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed index entry on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("unknown term: {0}")]
    UnknownTerm(String),

    #[error("query has no terms")]
    EmptyQuery,

    #[error("no document contains all query terms")]
    NoMatches,
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    /// Query errors are reported to callers as "not found" rather than as failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IndexError::UnknownTerm(_) | IndexError::EmptyQuery | IndexError::NoMatches
        )
    }
}
