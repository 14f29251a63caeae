pub mod auth;
pub mod http;
pub mod stats;

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::Entity;
use crate::error::ApiError;

pub use http::{ApiClient, HttpCrudApi};
pub use stats::SummaryStats;

/// Remote CRUD operations for one entity type.
///
/// Each call is a single attempt. Failures come back classified, never as
/// panics.
#[async_trait]
pub trait CrudApi<T: Entity>: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<T>, ApiError>;

    /// Returns the entity as stored by the server (with its assigned id)
    async fn create(&self, draft: &Value) -> Result<T, ApiError>;

    async fn update(&self, id: &T::Id, patch: &Value) -> Result<T, ApiError>;

    async fn delete(&self, id: &T::Id) -> Result<(), ApiError>;
}
