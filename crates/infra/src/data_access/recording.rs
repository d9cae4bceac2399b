//! Call-recording wrapper around any data-access seam.
//!
//! Tests assert on what a job asked the seam to do (how many batches, which
//! records, in which order) instead of on mock expectations.

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crewjobs_core::RecordId;
use crewjobs_engine::{DataAccess, Operation, PersistenceError, PersistenceResult, Record};

/// One recorded seam call.
pub struct RecordedCall {
    pub operation: Operation,
    pub kind: &'static str,
    /// `save` only.
    pub is_new: Option<bool>,
    /// Clone of the batch for `save`/`delete`; `None` for `get`.
    batch: Option<Box<dyn Any + Send + Sync>>,
}

impl RecordedCall {
    fn batch<T: Record>(&self) -> Option<&Vec<T>> {
        self.batch.as_ref().and_then(|b| b.downcast_ref::<Vec<T>>())
    }
}

impl core::fmt::Debug for RecordedCall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordedCall")
            .field("operation", &self.operation)
            .field("kind", &self.kind)
            .field("is_new", &self.is_new)
            .finish()
    }
}

/// Wraps a seam, recording every call and optionally failing chosen ones.
pub struct RecordingDataAccess<D> {
    inner: Arc<D>,
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<HashSet<(Operation, &'static str)>>,
}

impl<D: DataAccess> RecordingDataAccess<D> {
    pub fn new(inner: Arc<D>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &Arc<D> {
        &self.inner
    }

    /// Make every later `operation` on `T` fail with `PersistenceError::Unavailable`.
    pub fn fail_on<T: Record>(&self, operation: Operation) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((operation, T::KIND));
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<(Operation, &'static str)> {
        self.lock_calls()
            .iter()
            .map(|c| (c.operation, c.kind))
            .collect()
    }

    /// Number of `operation` calls on record kind `T`.
    pub fn count<T: Record>(&self, operation: Operation) -> usize {
        self.lock_calls()
            .iter()
            .filter(|c| c.operation == operation && c.kind == T::KIND)
            .count()
    }

    /// Batches passed to `save::<T>`, in call order, with the `is_new` flag.
    pub fn saved<T: Record>(&self) -> Vec<(Vec<T>, bool)> {
        self.lock_calls()
            .iter()
            .filter(|c| c.operation == Operation::Save)
            .filter_map(|c| Some((c.batch::<T>()?.clone(), c.is_new.unwrap_or_default())))
            .collect()
    }

    /// Batches passed to `delete::<T>`, in call order.
    pub fn deleted<T: Record>(&self) -> Vec<Vec<T>> {
        self.lock_calls()
            .iter()
            .filter(|c| c.operation == Operation::Delete)
            .filter_map(|c| c.batch::<T>().cloned())
            .collect()
    }

    /// Forget recorded calls (fault injection stays in place).
    pub fn reset(&self) {
        self.lock_calls().clear();
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<T: Record>(&self, operation: Operation, is_new: Option<bool>, batch: Option<Vec<T>>) {
        self.lock_calls().push(RecordedCall {
            operation,
            kind: T::KIND,
            is_new,
            batch: batch.map(|b| Box::new(b) as Box<dyn Any + Send + Sync>),
        });
    }

    fn injected<T: Record>(&self, operation: Operation) -> PersistenceResult<()> {
        let fail = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(operation, T::KIND));
        if fail {
            return Err(PersistenceError::Unavailable(format!(
                "injected failure on {operation} {}",
                T::KIND
            )));
        }
        Ok(())
    }
}

impl<D: DataAccess> DataAccess for RecordingDataAccess<D> {
    fn get<T, P>(&self, predicate: P) -> PersistenceResult<Vec<T>>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        self.record::<T>(Operation::Get, None, None);
        self.injected::<T>(Operation::Get)?;
        self.inner.get(predicate)
    }

    fn get_by_id<T: Record>(&self, id: RecordId) -> PersistenceResult<Option<T>> {
        self.record::<T>(Operation::Get, None, None);
        self.injected::<T>(Operation::Get)?;
        self.inner.get_by_id(id)
    }

    fn save<T: Record>(&self, items: Vec<T>, is_new: bool) -> PersistenceResult<Vec<T>> {
        self.record(Operation::Save, Some(is_new), Some(items.clone()));
        self.injected::<T>(Operation::Save)?;
        self.inner.save(items, is_new)
    }

    fn delete<T: Record>(&self, items: &[T]) -> PersistenceResult<()> {
        self.record(Operation::Delete, None, Some(items.to_vec()));
        self.injected::<T>(Operation::Delete)?;
        self.inner.delete(items)
    }
}

impl<D> core::fmt::Debug for RecordingDataAccess<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let calls = self.calls.lock().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("RecordingDataAccess")
            .field("calls", &calls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_access::InMemoryDataAccess;

    #[derive(Debug, Clone, PartialEq)]
    struct Crew {
        id: Option<RecordId>,
        name: &'static str,
    }

    impl Record for Crew {
        const KIND: &'static str = "crew";

        fn id(&self) -> Option<RecordId> {
            self.id
        }

        fn assign_id(&mut self, id: RecordId) {
            self.id = Some(id);
        }
    }

    fn crew(name: &'static str) -> Crew {
        Crew { id: None, name }
    }

    #[test]
    fn records_batches_as_passed_in() {
        let store = RecordingDataAccess::new(Arc::new(InMemoryDataAccess::new()));

        let saved = store.save(vec![crew("a"), crew("b")], true).unwrap();
        store.delete(&saved[..1]).unwrap();
        let _ = store.get_all::<Crew>().unwrap();

        assert_eq!(
            store.calls(),
            vec![
                (Operation::Save, "crew"),
                (Operation::Delete, "crew"),
                (Operation::Get, "crew"),
            ]
        );

        let batches = store.saved::<Crew>();
        assert_eq!(batches.len(), 1);
        let (batch, is_new) = &batches[0];
        assert!(*is_new);
        // Recorded before identity assignment.
        assert_eq!(batch, &vec![crew("a"), crew("b")]);

        assert_eq!(store.deleted::<Crew>(), vec![vec![saved[0].clone()]]);
        assert_eq!(store.count::<Crew>(Operation::Save), 1);
        assert_eq!(store.inner().count::<Crew>(), 1);
    }

    #[test]
    fn injected_failures_reach_the_caller_and_skip_the_inner_store() {
        let store = RecordingDataAccess::new(Arc::new(InMemoryDataAccess::new()));
        store.fail_on::<Crew>(Operation::Save);

        let err = store.save(vec![crew("a")], true).unwrap_err();

        assert_eq!(
            err,
            PersistenceError::Unavailable("injected failure on save crew".to_string())
        );
        assert_eq!(store.count::<Crew>(Operation::Save), 1);
        assert_eq!(store.inner().count::<Crew>(), 0);
    }

    #[test]
    fn reset_clears_history() {
        let store = RecordingDataAccess::new(Arc::new(InMemoryDataAccess::new()));
        let _ = store.get_all::<Crew>().unwrap();
        store.reset();
        assert!(store.calls().is_empty());
    }
}
