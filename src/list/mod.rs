//! Cached, searchable, sortable mirror of one entity type

pub mod query;
pub mod sort;

use serde::Serialize;
use serde_json::Value;

use crate::api::CrudApi;
use crate::entity::Entity;
use crate::error::{ApiError, ErrorDescriptor, ErrorKind, Severity};

pub use query::{filter_entities, matches_query};
pub use sort::{compare_values, SortDirection, SortState};

/// Keeps the client's copy of one entity type in step with the server.
///
/// `canonical` only changes after the server confirmed an operation. The
/// rendered view is derived from `canonical`, the search query and the sort
/// selection, and is rebuilt whenever any of them changes.
pub struct EntityListController<T: Entity, A: CrudApi<T>> {
    api: A,
    canonical: Vec<T>,
    query: String,
    sort: SortState,
    view: Vec<usize>,
}

impl<T: Entity, A: CrudApi<T>> EntityListController<T, A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            canonical: Vec::new(),
            query: String::new(),
            sort: SortState::default(),
            view: Vec::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn canonical(&self) -> &[T] {
        &self.canonical
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    /// Rows to display, filtered and ordered.
    pub fn rendered(&self) -> Vec<&T> {
        self.view.iter().map(|&i| &self.canonical[i]).collect()
    }

    /// Replace the cached list with the server's. On failure the cache is
    /// left as it was.
    pub async fn load(&mut self) -> Result<usize, ErrorDescriptor> {
        match self.api.fetch_all().await {
            Ok(items) => {
                tracing::debug!("Loaded {} {} records", items.len(), T::RESOURCE.label);
                self.canonical = items;
                self.refresh();
                Ok(self.canonical.len())
            }
            Err(e) => Err(self.failed("load", e)),
        }
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.query = text.into();
        self.refresh();
    }

    pub fn set_sort(&mut self, field: &str) {
        self.sort.toggle(field);
        self.refresh();
    }

    /// Add a record. Only the server's version is inserted, never the draft.
    pub async fn create<D: Serialize + Sync>(&mut self, draft: &D) -> Result<T, ErrorDescriptor> {
        let draft = Self::to_payload(draft)?;
        match self.api.create(&draft).await {
            Ok(created) => {
                tracing::info!("Created {} {}", T::RESOURCE.label, created.id());
                self.canonical.push(created.clone());
                self.refresh();
                Ok(created)
            }
            Err(e) => Err(self.failed("create", e)),
        }
    }

    /// Apply `patch` remotely and swap in the server's result.
    ///
    /// If the record is no longer cached the list is left alone and a
    /// warning comes back. A not-found answer from the server drops the
    /// cached copy.
    pub async fn update<P: Serialize + Sync>(&mut self, id: &T::Id, patch: &P) -> Result<T, ErrorDescriptor> {
        let patch = Self::to_payload(patch)?;
        match self.api.update(id, &patch).await {
            Ok(updated) => match self.canonical.iter_mut().find(|e| e.id() == id) {
                Some(slot) => {
                    tracing::info!("Updated {} {}", T::RESOURCE.label, id);
                    *slot = updated.clone();
                    self.refresh();
                    Ok(updated)
                }
                None => {
                    tracing::warn!("Updated {} {} is not in the cached list", T::RESOURCE.label, id);
                    Err(ErrorDescriptor {
                        kind: ErrorKind::NotFound,
                        message: format!(
                            "The {} being edited is no longer in the list. Reload to see current data.",
                            T::RESOURCE.label
                        ),
                        severity: Severity::Warning,
                    })
                }
            },
            Err(e @ ApiError::NotFound(_)) => {
                self.evict(id);
                Err(self.failed("update", e))
            }
            Err(e) => Err(self.failed("update", e)),
        }
    }

    /// Delete remotely and drop the cached copy. Deleting something that
    /// is already gone succeeds.
    pub async fn remove(&mut self, id: &T::Id) -> Result<(), ErrorDescriptor> {
        match self.api.delete(id).await {
            Ok(()) => {
                tracing::info!("Deleted {} {}", T::RESOURCE.label, id);
                self.evict(id);
                Ok(())
            }
            Err(ApiError::NotFound(_)) => {
                tracing::debug!("{} {} was already gone", T::RESOURCE.label, id);
                self.evict(id);
                Ok(())
            }
            Err(e) => Err(self.failed("delete", e)),
        }
    }

    fn evict(&mut self, id: &T::Id) {
        let before = self.canonical.len();
        self.canonical.retain(|e| e.id() != id);
        if self.canonical.len() != before {
            self.refresh();
        }
    }

    fn to_payload<S: Serialize>(value: &S) -> Result<Value, ErrorDescriptor> {
        match serde_json::to_value(value) {
            Ok(v @ Value::Object(_)) => Ok(v),
            Ok(_) => Err(ApiError::validation("Expected an object with field values").descriptor()),
            Err(e) => Err(ApiError::validation(format!("Invalid field values: {}", e)).descriptor()),
        }
    }

    fn failed(&self, operation: &str, error: ApiError) -> ErrorDescriptor {
        tracing::warn!(
            "Failed to {} {}: {} ({})",
            operation,
            T::RESOURCE.label,
            error,
            error.error_code()
        );
        error.descriptor()
    }

    fn refresh(&mut self) {
        let mut rows: Vec<usize> = (0..self.canonical.len())
            .filter(|&i| matches_query(&self.canonical[i], &self.query))
            .collect();

        if let Some((field, direction)) = self.sort.active() {
            let mut keyed: Vec<(usize, Option<Value>)> = rows
                .into_iter()
                .map(|i| (i, self.canonical[i].sort_value(field)))
                .collect();
            // Stable, so equal keys keep their canonical order
            keyed.sort_by(|(_, a), (_, b)| direction.apply(compare_values(a.as_ref(), b.as_ref())));
            rows = keyed.into_iter().map(|(i, _)| i).collect();
        }

        tracing::debug!(
            "{} view: {} of {} rows",
            T::RESOURCE.label,
            rows.len(),
            self.canonical.len()
        );
        self.view = rows;
    }
}
