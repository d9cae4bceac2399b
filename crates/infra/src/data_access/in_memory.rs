//! In-memory data-access store for tests/dev.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use tracing::debug;

use crewjobs_core::RecordId;
use crewjobs_engine::{DataAccess, PersistenceError, PersistenceResult, Record};

/// Rows of one record type, keyed by identity.
struct Table<T> {
    rows: BTreeMap<RecordId, T>,
}

impl<T: Record> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    fn check_natural_keys(&self) -> PersistenceResult<()> {
        let mut seen = HashSet::new();
        for key in self.rows.values().filter_map(|row| row.natural_key()) {
            if !seen.insert(key.clone()) {
                return Err(PersistenceError::constraint(
                    T::KIND,
                    format!("duplicate key {key}"),
                ));
            }
        }
        Ok(())
    }
}

/// Type-keyed, in-process store.
///
/// - No IO
/// - Identity is a single counter shared by all tables, starting at 1
/// - Batches are validated and applied on a copy, then swapped in, so a failed
///   batch leaves nothing behind
pub struct InMemoryDataAccess {
    tables: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    next_id: RwLock<i64>,
}

impl InMemoryDataAccess {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Insert fixtures, keeping any identity they already carry.
    pub fn seed<T: Record>(&self, items: impl IntoIterator<Item = T>) -> PersistenceResult<Vec<T>> {
        let (with_id, without_id): (Vec<T>, Vec<T>) =
            items.into_iter().partition(|item| item.id().is_some());

        let mut seeded = Vec::new();
        if !with_id.is_empty() {
            self.mutate::<T, _>(|table, next_id| {
                for item in &with_id {
                    if let Some(id) = item.id() {
                        *next_id = (*next_id).max(id.get() + 1);
                        table.rows.insert(id, item.clone());
                    }
                }
                Ok(())
            })?;
            seeded.extend(with_id);
        }
        if !without_id.is_empty() {
            seeded.extend(self.save(without_id, true)?);
        }
        Ok(seeded)
    }

    /// Number of stored records of type `T`.
    pub fn count<T: Record>(&self) -> usize {
        self.read::<T, _, _>(|table| table.rows.len()).unwrap_or(0)
    }

    fn poisoned() -> PersistenceError {
        PersistenceError::Unavailable("in-memory store lock poisoned".to_string())
    }

    fn read<T, F, R>(&self, f: F) -> PersistenceResult<R>
    where
        T: Record,
        F: FnOnce(&Table<T>) -> R,
    {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        match tables
            .get(&TypeId::of::<T>())
            .and_then(|t| t.downcast_ref::<Table<T>>())
        {
            Some(table) => Ok(f(table)),
            None => Ok(f(&Table::new())),
        }
    }

    /// Apply `f` to a copy of the table; commit only if it and the key check succeed.
    fn mutate<T, F>(&self, f: F) -> PersistenceResult<()>
    where
        T: Record,
        F: FnOnce(&mut Table<T>, &mut i64) -> PersistenceResult<()>,
    {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let mut next_id = self.next_id.write().map_err(|_| Self::poisoned())?;

        let mut draft = Table::<T> {
            rows: tables
                .get(&TypeId::of::<T>())
                .and_then(|t| t.downcast_ref::<Table<T>>())
                .map(|t| t.rows.clone())
                .unwrap_or_default(),
        };
        let mut draft_next = *next_id;

        f(&mut draft, &mut draft_next)?;
        draft.check_natural_keys()?;

        tables.insert(TypeId::of::<T>(), Box::new(draft));
        *next_id = draft_next;
        Ok(())
    }
}

impl Default for InMemoryDataAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InMemoryDataAccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let tables = self.tables.read().map(|t| t.len()).unwrap_or(0);
        f.debug_struct("InMemoryDataAccess")
            .field("tables", &tables)
            .finish()
    }
}

impl DataAccess for InMemoryDataAccess {
    fn get<T, P>(&self, predicate: P) -> PersistenceResult<Vec<T>>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        self.read::<T, _, _>(|table| {
            table
                .rows
                .values()
                .filter(|row| predicate(row))
                .cloned()
                .collect()
        })
    }

    fn get_by_id<T: Record>(&self, id: RecordId) -> PersistenceResult<Option<T>> {
        self.read::<T, _, _>(|table| table.rows.get(&id).cloned())
    }

    fn save<T: Record>(&self, items: Vec<T>, is_new: bool) -> PersistenceResult<Vec<T>> {
        let mut saved = Vec::with_capacity(items.len());
        self.mutate::<T, _>(|table, next_id| {
            for mut item in items {
                match (is_new, item.id()) {
                    (true, None) => {
                        let id = RecordId::new(*next_id);
                        *next_id += 1;
                        item.assign_id(id);
                        table.rows.insert(id, item.clone());
                    }
                    (true, Some(id)) => {
                        return Err(PersistenceError::constraint(
                            T::KIND,
                            format!("new record already has identity {id}"),
                        ));
                    }
                    (false, Some(id)) if table.rows.contains_key(&id) => {
                        table.rows.insert(id, item.clone());
                    }
                    (false, Some(id)) => return Err(PersistenceError::NotFound { kind: T::KIND, id }),
                    (false, None) => {
                        return Err(PersistenceError::constraint(
                            T::KIND,
                            "update of a record without identity",
                        ));
                    }
                }
                saved.push(item);
            }
            Ok(())
        })?;

        debug!(kind = T::KIND, count = saved.len(), is_new, "saved batch");
        Ok(saved)
    }

    fn delete<T: Record>(&self, items: &[T]) -> PersistenceResult<()> {
        self.mutate::<T, _>(|table, _| {
            for item in items {
                let Some(id) = item.id() else {
                    return Err(PersistenceError::constraint(
                        T::KIND,
                        "delete of a record without identity",
                    ));
                };
                if table.rows.remove(&id).is_none() {
                    return Err(PersistenceError::NotFound { kind: T::KIND, id });
                }
            }
            Ok(())
        })?;

        debug!(kind = T::KIND, count = items.len(), "deleted batch");
        Ok(())
    }
}
