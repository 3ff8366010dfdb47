//! Document model shared by the store and the index

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Composite key identifying a document: `(collection, name)`.
///
/// Rendered as a single `collection:name` token, which also serves as the
/// index's unique primary field. The collection part must not contain `:`;
/// the name may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    pub collection: String,
    pub name: String,
}

impl DocumentId {
    pub fn new(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
        }
    }

    /// Parse a `collection:name` token, splitting on the first `:`.
    pub fn parse(token: &str) -> Option<Self> {
        let (collection, name) = token.split_once(':')?;
        Some(Self::new(collection, name))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.name)
    }
}

/// Value of an extensible document field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Plain text
    Text(String),
    /// Sequence of text values
    List(Vec<String>),
    /// Raw bytes; may or may not decode as UTF-8
    Blob(Vec<u8>),
}

/// A named, versioned unit of content belonging to a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Collection the document belongs to
    pub collection: String,

    /// Document name, unique within its collection
    pub name: String,

    /// Store revision number
    pub revision: u64,

    /// Body text
    pub text: String,

    /// Tags
    pub tags: Vec<String>,

    /// Last modification timestamp (store-formatted)
    pub modified: Option<String>,

    /// User who last modified the document
    pub modifier: Option<String>,

    /// Creation timestamp (store-formatted)
    pub created: Option<String>,

    /// User who created the document
    pub creator: Option<String>,

    /// Content type; `None` means plain text
    pub content_type: Option<String>,

    /// Extensible fields beyond the fixed attributes
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

impl Document {
    pub fn new(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
            revision: 0,
            text: String::new(),
            tags: Vec::new(),
            modified: None,
            modifier: None,
            created: None,
            creator: None,
            content_type: None,
            fields: HashMap::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::new(self.collection.clone(), self.name.clone())
    }

    /// Whether the content is binary. Binary documents are excluded from
    /// the index entirely.
    pub fn is_binary(&self) -> bool {
        match self.content_type.as_deref() {
            None => false,
            Some(ct) => {
                !(ct.starts_with("text/")
                    || ct == "application/json"
                    || ct.ends_with("+json")
                    || ct.ends_with("+xml"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_round_trip() {
        let id = DocumentId::new("bag1", "doc1");
        assert_eq!(id.to_string(), "bag1:doc1");
        assert_eq!(DocumentId::parse("bag1:doc1"), Some(id));
    }

    #[test]
    fn test_document_id_name_may_contain_colon() {
        let id = DocumentId::parse("notes:2024:plan").unwrap();
        assert_eq!(id.collection, "notes");
        assert_eq!(id.name, "2024:plan");
    }

    #[test]
    fn test_document_id_parse_rejects_bare_token() {
        assert_eq!(DocumentId::parse("no-delimiter"), None);
    }

    #[test]
    fn test_binary_detection() {
        let mut doc = Document::new("pics", "cat.png");
        assert!(!doc.is_binary());

        doc.content_type = Some("image/png".to_string());
        assert!(doc.is_binary());

        doc.content_type = Some("text/plain".to_string());
        assert!(!doc.is_binary());

        doc.content_type = Some("application/json".to_string());
        assert!(!doc.is_binary());

        doc.content_type = Some("image/svg+xml".to_string());
        assert!(!doc.is_binary());
    }
}
