//! Full-text search subsystem powered by Tantivy
//!
//! This module keeps the derived index and answers queries against it:
//!
//! - **Schema & projection**: declared field bindings map store documents
//!   onto the index schema, skipping absent or undecodable fields
//! - **Index management**: opens or creates the on-disk index, idempotently
//! - **Writer leasing**: bounded-retry acquisition of the single exclusive
//!   index writer
//! - **Mutations**: upsert/delete batches with all-or-nothing commit
//! - **Synchronization**: change-hook reconciliation and bulk reindexing
//! - **Queries**: boosted multi-field parsing with aliases, implicit AND,
//!   `OR`, and quoted phrases
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SearchService                  │
//! │  search() reindex() enqueue() optimize()     │
//! └──────────────────┬───────────────────────────┘
//!                    ▼
//! ┌──────────────┐ ┌──────────────┐ ┌───────────┐
//! │ QueryEngine  │ │ Synchronizer │ │WriterBroker│
//! └──────┬───────┘ └──────┬───────┘ └─────┬─────┘
//!        ▼                ▼               ▼
//! ┌──────────────────────────────────────────────┐
//! │        IndexManager (Tantivy index)          │
//! └──────────────────────────────────────────────┘
//! ```

mod error;
mod index;
mod mutation;
mod query;
mod schema;
mod service;
mod sync;
mod writer;

pub use error::{SearchError, SearchResult};
pub use index::{IndexManager, IndexStats};
pub use mutation::MutationBatch;
pub use query::{QueryEngine, SearchHit};
pub use schema::{
    FieldKind, FieldSource, ProjectedDocument, SearchSchema, SearchSchemaBuilder, IDENTITY_FIELD,
};
pub use service::SearchService;
pub use sync::{IndexSynchronizer, ReindexReport};
pub use writer::WriterBroker;
