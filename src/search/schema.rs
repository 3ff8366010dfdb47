//! Index schema and document projection
//!
//! The schema is a declared, ordered list of field bindings. Each binding
//! names an index field, the kind of indexing it gets, and the accessor
//! that pulls its value off a store document. Bindings are resolved when
//! the schema is built, so projection is a straight walk over typed
//! accessors with a per-binding fallible-conversion contract: a binding
//! yields a value, reports the field absent, or reports a decode failure.
//! Absent and undecodable fields are skipped; the document is indexed with
//! a partial field set rather than rejected.
//!
//! The schema is immutable for the lifetime of an index. Opening an
//! existing index uses the schema persisted on disk; a changed
//! configuration silently has no effect until the index is rebuilt from
//! scratch into a fresh directory.

use crate::models::{Document, FieldValue};
use std::collections::BTreeMap;
use tantivy::schema::{
    IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING, TEXT,
};

/// Name of the unique identity field present in every schema
pub const IDENTITY_FIELD: &str = "id";

/// How an index field is tokenized and weighted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Free text, default tokenizer
    Text { boost: f32 },

    /// Free text run through the English stemmer
    Stemmed,

    /// Keyword list; tokenized so individual keywords match
    Keyword { boost: f32 },

    /// Exact, untokenized value
    Exact,
}

impl FieldKind {
    /// Query-time boost weight; 1.0 for unboosted kinds
    pub fn boost(&self) -> f32 {
        match self {
            FieldKind::Text { boost } | FieldKind::Keyword { boost } => *boost,
            FieldKind::Stemmed | FieldKind::Exact => 1.0,
        }
    }
}

/// Accessor pulling a binding's value off a store document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Document name
    Name,
    /// Collection name
    Collection,
    /// Body text
    Text,
    /// Tag list, joined with `,`
    Tags,
    /// Modification timestamp
    Modified,
    /// Last modifying user
    Modifier,
    /// Creation timestamp
    Created,
    /// Creating user
    Creator,
    /// Extensible field looked up by key
    Extended(String),
}

/// Outcome of projecting one binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projected {
    Value(String),
    Absent,
    DecodeError,
}

/// Outcome of projecting a whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectedDocument {
    /// Binary content: the document must have no index entry at all
    Excluded,
    /// Flattened field values, possibly empty, identity not included
    Fields(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
struct FieldBinding {
    name: String,
    kind: FieldKind,
    source: FieldSource,
}

impl FieldBinding {
    fn project(&self, document: &Document) -> Projected {
        let raw = match &self.source {
            FieldSource::Name => Some(document.name.clone()),
            FieldSource::Collection => Some(document.collection.clone()),
            FieldSource::Text => Some(document.text.clone()),
            FieldSource::Tags => {
                if document.tags.is_empty() {
                    None
                } else {
                    Some(document.tags.join(","))
                }
            }
            FieldSource::Modified => document.modified.clone(),
            FieldSource::Modifier => document.modifier.clone(),
            FieldSource::Created => document.created.clone(),
            FieldSource::Creator => document.creator.clone(),
            FieldSource::Extended(key) => match document.fields.get(key) {
                None => None,
                Some(FieldValue::Text(value)) => Some(value.clone()),
                Some(FieldValue::List(values)) => Some(values.join(",")),
                Some(FieldValue::Blob(bytes)) => match std::str::from_utf8(bytes) {
                    Ok(value) => Some(value.to_string()),
                    Err(_) => return Projected::DecodeError,
                },
            },
        };

        match raw {
            Some(value) => Projected::Value(value.to_lowercase()),
            None => Projected::Absent,
        }
    }
}

/// Declared mapping from store documents onto index fields.
///
/// The default schema mirrors the classic wiki layout: boosted title,
/// boosted tags, stemmed body text, exact audit fields, and the stored
/// unique identity.
#[derive(Debug, Clone)]
pub struct SearchSchema {
    bindings: Vec<FieldBinding>,
    default_fields: Vec<String>,
    aliases: BTreeMap<String, String>,
}

impl SearchSchema {
    pub fn builder() -> SearchSchemaBuilder {
        SearchSchemaBuilder::new()
    }

    /// Fields queried when a term carries no field prefix
    pub fn default_fields(&self) -> &[String] {
        &self.default_fields
    }

    /// Virtual field names rewritten to underlying schema fields at parse
    /// time
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Query-time boost per field, for fields boosted above 1.0
    pub fn boosts(&self) -> impl Iterator<Item = (&str, f32)> {
        self.bindings
            .iter()
            .filter(|binding| binding.kind.boost() != 1.0)
            .map(|binding| (binding.name.as_str(), binding.kind.boost()))
    }

    /// Build the Tantivy schema for a fresh index
    pub fn to_tantivy(&self) -> Schema {
        let mut builder = Schema::builder();

        for binding in &self.bindings {
            match binding.kind {
                FieldKind::Text { .. } | FieldKind::Keyword { .. } => {
                    builder.add_text_field(&binding.name, TEXT);
                }
                FieldKind::Stemmed => {
                    let indexing = TextFieldIndexing::default()
                        .set_tokenizer("en_stem")
                        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
                    builder.add_text_field(
                        &binding.name,
                        TextOptions::default().set_indexing_options(indexing),
                    );
                }
                FieldKind::Exact => {
                    builder.add_text_field(&binding.name, STRING);
                }
            }
        }

        // Unique primary field; set on every entry, stored for result
        // identity resolution.
        builder.add_text_field(IDENTITY_FIELD, STRING | STORED);

        builder.build()
    }

    /// Project a document onto the schema's fields.
    ///
    /// Binary documents are excluded outright. Every other document yields
    /// the lowercased values of its present, decodable bindings; the
    /// identity field is appended later by the mutation layer, last and
    /// unconditionally.
    pub fn project(&self, document: &Document) -> ProjectedDocument {
        if document.is_binary() {
            return ProjectedDocument::Excluded;
        }

        let mut fields = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            match binding.project(document) {
                Projected::Value(value) => fields.push((binding.name.clone(), value)),
                Projected::Absent => {}
                Projected::DecodeError => {
                    tracing::debug!(
                        field = %binding.name,
                        document_id = %document.id(),
                        "skipping undecodable field"
                    );
                }
            }
        }

        ProjectedDocument::Fields(fields)
    }
}

impl Default for SearchSchema {
    fn default() -> Self {
        SearchSchemaBuilder::new()
            .field("title", FieldKind::Text { boost: 1.75 }, FieldSource::Name)
            .field("bag", FieldKind::Text { boost: 1.0 }, FieldSource::Collection)
            .field("text", FieldKind::Stemmed, FieldSource::Text)
            .field("modified", FieldKind::Exact, FieldSource::Modified)
            .field("modifier", FieldKind::Exact, FieldSource::Modifier)
            .field("created", FieldKind::Exact, FieldSource::Created)
            .field("creator", FieldKind::Exact, FieldSource::Creator)
            .field("tags", FieldKind::Keyword { boost: 1.5 }, FieldSource::Tags)
            .default_fields(["title", "tags", "text"])
            .alias("tag", "tags")
            .build()
    }
}

/// Builder for [`SearchSchema`]
pub struct SearchSchemaBuilder {
    bindings: Vec<FieldBinding>,
    default_fields: Vec<String>,
    aliases: BTreeMap<String, String>,
}

impl SearchSchemaBuilder {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            default_fields: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// Declare an index field with its kind and source accessor.
    ///
    /// The identity field name is reserved; a binding using it is ignored
    /// because the identity always overrides schema-sourced values.
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        source: FieldSource,
    ) -> Self {
        let name = name.into();
        if name != IDENTITY_FIELD {
            self.bindings.push(FieldBinding { name, kind, source });
        }
        self
    }

    /// Declare an extended field indexed under its own key
    pub fn extended_field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let source = FieldSource::Extended(name.clone());
        self.field(name, kind, source)
    }

    pub fn default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Map a virtual field name onto an underlying schema field
    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    pub fn build(self) -> SearchSchema {
        SearchSchema {
            bindings: self.bindings,
            default_fields: self.default_fields,
            aliases: self.aliases,
        }
    }
}

impl Default for SearchSchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
