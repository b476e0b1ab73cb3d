pub mod analysis;
pub mod builder;
pub mod document;
pub mod error;
pub mod posting;
pub mod reader;
pub mod store;
pub mod tokenizer;

pub use analysis::Pipeline;
pub use builder::IndexBuilder;
pub use document::{Document, FieldName};
pub use error::{IndexError, Result};
pub use posting::Posting;
pub use reader::IndexReader;
pub use store::INDEX_FILE;
