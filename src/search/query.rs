//! Query parsing and execution
//!
//! Queries use field-prefixed syntax (`field:value`), implicit AND between
//! terms, explicit `OR`, and quoted phrases. Field aliases are rewritten
//! onto their underlying schema fields before the string reaches the
//! parser, so `tag:x` and `tags:x` match identical results in any boolean
//! combination. Malformed syntax surfaces as a parse error for the caller;
//! it never crashes the serving process.

use crate::models::DocumentId;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::IndexManager;
use crate::search::schema::IDENTITY_FIELD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{Query, QueryParser};
use tantivy::schema::Value;
use tantivy::{ReloadPolicy, TantivyDocument};

/// A single ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The stored identity token (`collection:name`)
    pub id: String,

    /// The identity parsed back into its parts, when well-formed
    pub document: Option<DocumentId>,

    /// Relevance score
    pub score: f32,

    /// All stored field values on the entry
    pub stored: HashMap<String, String>,
}

/// Parses and executes boosted multi-field queries
pub struct QueryEngine {
    manager: Arc<IndexManager>,
    results_limit: usize,
}

impl QueryEngine {
    pub fn new(manager: Arc<IndexManager>, results_limit: usize) -> Self {
        Self {
            manager,
            results_limit,
        }
    }

    fn parser(&self) -> QueryParser {
        let schema = self.manager.schema();
        let search_schema = self.manager.search_schema();

        let default_fields = search_schema
            .default_fields()
            .iter()
            .filter_map(|name| schema.get_field(name).ok())
            .collect();

        let mut parser = QueryParser::for_index(self.manager.index(), default_fields);
        // Space-separated terms intersect unless OR is explicit.
        parser.set_conjunction_by_default();
        for (name, boost) in search_schema.boosts() {
            if let Ok(field) = schema.get_field(name) {
                parser.set_field_boost(field, boost);
            }
        }
        parser
    }

    /// Parse a raw query string into an executable query
    pub fn parse(&self, raw: &str) -> SearchResult<Box<dyn Query>> {
        let rewritten = rewrite_aliases(raw, self.manager.search_schema().aliases());
        tracing::debug!(query = %rewritten, "parsed search query");
        self.parser()
            .parse_query(&rewritten)
            .map_err(|e| SearchError::QueryParsingFailed(e.to_string()))
    }

    /// Parse and execute a query against a fresh point-in-time snapshot,
    /// returning hits ordered by descending relevance.
    pub fn search(&self, raw: &str, limit: usize) -> SearchResult<Vec<SearchHit>> {
        // TopDocs requires a strictly positive limit.
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = self.parse(raw)?;

        let reader = self
            .manager
            .index()
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: tantivy::TantivyError| SearchError::SearchFailed(e.to_string()))?;
        let searcher = reader.searcher();

        let top_docs = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;

        let schema = self.manager.schema();
        let mut hits = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;

            let mut stored = HashMap::new();
            for (field, entry) in schema.fields() {
                if !entry.is_stored() {
                    continue;
                }
                if let Some(value) = doc.get_first(field).and_then(|v| v.as_str()) {
                    stored.insert(entry.name().to_string(), value.to_string());
                }
            }

            let id = stored.get(IDENTITY_FIELD).cloned().unwrap_or_default();
            let document = DocumentId::parse(&id);

            hits.push(SearchHit {
                id,
                document,
                score,
                stored,
            });
        }

        Ok(hits)
    }

    /// Search with the configured default result limit
    pub fn search_default(&self, raw: &str) -> SearchResult<Vec<SearchHit>> {
        self.search(raw, self.results_limit)
    }
}

/// Rewrite aliased field prefixes onto their underlying schema fields.
///
/// Only bare `ident:` prefixes outside quoted phrases are rewritten; terms,
/// phrase contents, and non-alias prefixes pass through untouched.
fn rewrite_aliases(raw: &str, aliases: &BTreeMap<String, String>) -> String {
    if aliases.is_empty() {
        return raw.to_string();
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut in_quotes = false;
    let mut at_boundary = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' {
            in_quotes = !in_quotes;
            out.push(c);
            at_boundary = false;
            i += 1;
            continue;
        }

        if !in_quotes && at_boundary && (c.is_alphanumeric() || c == '_') {
            let mut j = i;
            while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            if j < chars.len() && chars[j] == ':' {
                let ident: String = chars[i..j].iter().collect();
                match aliases.get(&ident) {
                    Some(target) => out.push_str(target),
                    None => out.push_str(&ident),
                }
                out.push(':');
                i = j + 1;
            } else {
                out.extend(chars[i..j].iter());
                i = j;
            }
            at_boundary = false;
            continue;
        }

        at_boundary = !in_quotes && (c.is_whitespace() || matches!(c, '(' | '+' | '-'));
        out.push(c);
        i += 1;
    }

    out
}
