use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldName {
    Title,
    Author,
    AuthorOrg,
    Category,
    Content,
    NewsDate,
    Place,
    FileId,
}

impl FieldName {
    /// Fields indexed value by value; TITLE is handled separately.
    pub const INDEXED: [FieldName; 6] = [
        FieldName::Author,
        FieldName::AuthorOrg,
        FieldName::Category,
        FieldName::Content,
        FieldName::NewsDate,
        FieldName::Place,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Title => "TITLE",
            FieldName::Author => "AUTHOR",
            FieldName::AuthorOrg => "AUTHORORG",
            FieldName::Category => "CATEGORY",
            FieldName::Content => "CONTENT",
            FieldName::NewsDate => "NEWSDATE",
            FieldName::Place => "PLACE",
            FieldName::FileId => "FILEID",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown field name: {}", self.0) }
}

impl std::error::Error for UnknownField {}

impl FromStr for FieldName {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TITLE" => Ok(FieldName::Title),
            "AUTHOR" => Ok(FieldName::Author),
            "AUTHORORG" => Ok(FieldName::AuthorOrg),
            "CATEGORY" => Ok(FieldName::Category),
            "CONTENT" => Ok(FieldName::Content),
            "NEWSDATE" => Ok(FieldName::NewsDate),
            "PLACE" => Ok(FieldName::Place),
            "FILEID" => Ok(FieldName::FileId),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

/// A field-structured record: zero or more string values per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: BTreeMap<FieldName, Vec<String>>,
}

impl Document {
    pub fn new() -> Self { Self::default() }

    pub fn with_field(mut self, name: FieldName, value: impl Into<String>) -> Self {
        self.add_value(name, value);
        self
    }

    pub fn add_value(&mut self, name: FieldName, value: impl Into<String>) {
        self.fields.entry(name).or_default().push(value.into());
    }

    /// Values for `name`, or `None` when the field has none.
    pub fn get_field(&self, name: FieldName) -> Option<&[String]> {
        self.fields.get(&name).filter(|v| !v.is_empty()).map(|v| v.as_slice())
    }

    /// The first FILEID value.
    pub fn id(&self) -> Option<&str> {
        self.get_field(FieldName::FileId).and_then(|v| v.first()).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_names_case_insensitively() {
        assert_eq!("authorOrg".parse::<FieldName>(), Ok(FieldName::AuthorOrg));
        assert_eq!(" FILEID ".parse::<FieldName>(), Ok(FieldName::FileId));
        assert!("body".parse::<FieldName>().is_err());
        assert_eq!(FieldName::NewsDate.to_string(), "NEWSDATE");
    }

    #[test]
    fn absent_fields_are_none() {
        let doc = Document::new().with_field(FieldName::FileId, "0001").with_field(FieldName::Content, "hello");
        assert_eq!(doc.id(), Some("0001"));
        assert!(doc.get_field(FieldName::Title).is_none());
        assert_eq!(doc.get_field(FieldName::Content), Some(&["hello".to_string()][..]));
    }
}
