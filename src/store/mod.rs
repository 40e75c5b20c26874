//! Record store abstraction
//!
//! The reconciler talks to persistence only through [`RecordStore`]. Each
//! table gets a filtered select, an insert or an upsert keyed by its unique
//! constraint, and a filtered delete where the import needs one.
//!
//! - [`memory`] - In-process store enforcing the same constraints, for tests
//! - [`sqlite`] - rusqlite-backed store used by the CLI

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{
    NewOffer, NewQualification, NewRto, NewStream, NewUnit, Offer, Owner, Qualification,
    RecordId, Rto, Stream, StreamUnitLink, Unit, UnitLink,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{operation}: {message}")]
    Query { operation: String, message: String },

    #[error("{table}: duplicate key {key}")]
    Constraint { table: String, key: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn constraint(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Constraint {
            table: table.into(),
            key: key.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence operations needed by an import
///
/// Code filters expect upper-cased codes. Stream names compare
/// case-insensitively within an owner. Upserts overwrite the non-key
/// columns of an existing row.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select_rtos(&self, codes: &[String]) -> StoreResult<Vec<Rto>>;
    async fn insert_rtos(&self, rows: &[NewRto]) -> StoreResult<Vec<Rto>>;

    async fn select_qualifications(&self, codes: &[String]) -> StoreResult<Vec<Qualification>>;
    /// Upsert on `code`
    async fn upsert_qualifications(
        &self,
        rows: &[NewQualification],
    ) -> StoreResult<Vec<Qualification>>;

    async fn select_units(&self, codes: &[String]) -> StoreResult<Vec<Unit>>;
    /// Upsert on `code`
    async fn upsert_units(&self, rows: &[NewUnit]) -> StoreResult<Vec<Unit>>;

    /// Offers belonging to any of the given RTOs
    async fn select_offers(&self, rto_ids: &[RecordId]) -> StoreResult<Vec<Offer>>;
    async fn insert_offers(&self, rows: &[NewOffer]) -> StoreResult<Vec<Offer>>;

    async fn select_unit_links(&self, owners: &[Owner]) -> StoreResult<Vec<UnitLink>>;
    /// Upsert on (owner, unit)
    async fn upsert_unit_links(&self, rows: &[UnitLink]) -> StoreResult<()>;
    /// Returns the number of links removed
    async fn delete_unit_links(&self, owner: &Owner, unit_ids: &[RecordId])
    -> StoreResult<usize>;

    async fn select_streams(&self, owners: &[Owner]) -> StoreResult<Vec<Stream>>;
    async fn insert_streams(&self, rows: &[NewStream]) -> StoreResult<Vec<Stream>>;

    async fn select_stream_units(&self, stream_ids: &[RecordId])
    -> StoreResult<Vec<StreamUnitLink>>;
    /// Upsert on (stream, unit)
    async fn upsert_stream_units(&self, rows: &[StreamUnitLink]) -> StoreResult<()>;
    /// Remove every unit link of one stream
    async fn delete_stream_units(&self, stream_id: &RecordId) -> StoreResult<usize>;

    /// Distinct unit ids referenced by any stream of an offer
    async fn offer_stream_unit_ids(&self, offer_id: &RecordId) -> StoreResult<Vec<RecordId>>;
}

/// Fresh identifier for a new row
pub(crate) fn new_id() -> RecordId {
    uuid::Uuid::new_v4().to_string()
}
