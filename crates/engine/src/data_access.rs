//! Data-access seam: the only way a job reaches persistence.

use std::sync::Arc;

use thiserror::Error;

use crewjobs_core::RecordId;

/// A persisted record type.
///
/// Identity is assigned by the store on the first save; `natural_key` lets a
/// store enforce "one record per (parent, child)" uniqueness without knowing
/// anything about the domain.
pub trait Record: Clone + Send + Sync + 'static {
    /// Stable name of the record kind (used in errors, logs and call recordings).
    const KIND: &'static str;

    fn id(&self) -> Option<RecordId>;

    fn assign_id(&mut self, id: RecordId);

    /// Business key that must be unique across the stored table, if any.
    fn natural_key(&self) -> Option<String> {
        None
    }
}

/// Seam operation, used for call recording and fault injection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Save,
    Delete,
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Operation::Get => "get",
            Operation::Save => "save",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Persistence failure (connectivity or constraint).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated on {kind}: {reason}")]
    Constraint { kind: &'static str, reason: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: RecordId },
}

impl PersistenceError {
    pub fn constraint(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Constraint {
            kind,
            reason: reason.into(),
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence abstraction every job depends on.
///
/// Batch operations (`save`, `delete`) are atomic as observed by later reads:
/// either every item in the batch is applied or none is. Implementations must
/// not have side effects beyond the named operation.
pub trait DataAccess: Send + Sync {
    /// Records of type `T` matching `predicate`, ordered by identity.
    fn get<T, P>(&self, predicate: P) -> PersistenceResult<Vec<T>>
    where
        T: Record,
        P: Fn(&T) -> bool;

    fn get_all<T: Record>(&self) -> PersistenceResult<Vec<T>> {
        self.get(|_: &T| true)
    }

    fn get_by_id<T: Record>(&self, id: RecordId) -> PersistenceResult<Option<T>> {
        Ok(self
            .get(|record: &T| record.id() == Some(id))?
            .into_iter()
            .next())
    }

    /// Persist a batch.
    ///
    /// With `is_new` every item must be unsaved and is returned with its
    /// assigned identity; otherwise every item must already exist and is
    /// replaced.
    fn save<T: Record>(&self, items: Vec<T>, is_new: bool) -> PersistenceResult<Vec<T>>;

    /// Remove a batch. Every item must exist.
    fn delete<T: Record>(&self, items: &[T]) -> PersistenceResult<()>;
}

impl<D> DataAccess for Arc<D>
where
    D: DataAccess,
{
    fn get<T, P>(&self, predicate: P) -> PersistenceResult<Vec<T>>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        (**self).get(predicate)
    }

    fn get_all<T: Record>(&self) -> PersistenceResult<Vec<T>> {
        (**self).get_all()
    }

    fn get_by_id<T: Record>(&self, id: RecordId) -> PersistenceResult<Option<T>> {
        (**self).get_by_id(id)
    }

    fn save<T: Record>(&self, items: Vec<T>, is_new: bool) -> PersistenceResult<Vec<T>> {
        (**self).save(items, is_new)
    }

    fn delete<T: Record>(&self, items: &[T]) -> PersistenceResult<()> {
        (**self).delete(items)
    }
}
