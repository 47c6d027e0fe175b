use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub mod memory;
pub mod predicate;

pub use memory::MemStore;
pub use predicate::{Clause, Predicate};

/// Document collections the backend persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    User,
    Retailer,
    Product,
    Offer,
}

/// Sort order applied before the pagination window.
#[derive(Debug, Clone)]
pub struct Sort {
    pub field: &'static str,
    pub descending: bool,
}

impl Sort {
    pub fn newest_first() -> Self {
        Self {
            field: "createdAt",
            descending: true,
        }
    }
}

/// Pagination window applied to `find`.
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: Option<Sort>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write. This is the race-safety backstop
    /// behind the application-level pre-checks.
    #[error("duplicate value for unique field `{field}`")]
    Duplicate { field: &'static str },
    #[error("{0}")]
    Backend(String),
}

/// Abstract document store. The policy engine, query composer and handlers
/// only ever see this trait; backends are injected through `AppState`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find(
        &self,
        kind: Kind,
        filter: &Predicate,
        window: &Window,
    ) -> Result<Vec<Value>, StoreError>;

    async fn find_one(&self, kind: Kind, filter: &Predicate) -> Result<Option<Value>, StoreError>;

    async fn count(&self, kind: Kind, filter: &Predicate) -> Result<u64, StoreError>;

    async fn insert(&self, kind: Kind, doc: Value) -> Result<Value, StoreError>;

    /// Shallow-merges `patch` into the stored document. Returns `None` when
    /// the id does not exist.
    async fn update_by_id(
        &self,
        kind: Kind,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, StoreError>;

    async fn delete_by_id(&self, kind: Kind, id: Uuid) -> Result<Option<Value>, StoreError>;
}
