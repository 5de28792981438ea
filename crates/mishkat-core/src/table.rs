//! Generic in-memory table
//!
//! One `Table` instance per entity kind. Every operation hands out
//! owned clones, so mutating a result never touches stored state, and
//! every operation is async so the calling contract survives a future
//! swap to a remote store.
//!
//! Mutations take the write lock for their whole read-modify-write
//! span, so two racing `create` calls cannot observe the same maximum
//! id.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Record identity: positive, unique per entity kind, never renumbered
pub type RecordId = i64;

/// Per-entity contract for records stored in a [`Table`]
pub trait Record: Clone + Send + Sync + 'static {
    /// Typed partial update; fields left unset are preserved
    type Patch: Send;

    fn id(&self) -> RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Merge a patch onto this record
    fn apply(&mut self, patch: Self::Patch);

    /// Text fields searched by [`Table::search`]
    fn search_fields(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Pluggable id allocation capability
pub trait IdAllocator: Send + Sync {
    /// Produce the id for the next record, given the highest id
    /// currently stored
    fn next(&self, current_max: RecordId) -> RecordId;
}

/// Reference allocator: `max(existing, 0) + 1`
///
/// Reproduces the single-threaded scan of the original service. After
/// the record holding the current maximum is deleted, its id can be
/// handed out again; use [`Monotonic`] where ids must never repeat.
pub struct MaxScan;

impl IdAllocator for MaxScan {
    fn next(&self, current_max: RecordId) -> RecordId {
        current_max.max(0) + 1
    }
}

/// Compare-and-swap high-water allocator
///
/// Never hands out an id twice, even after the record holding the
/// current maximum is deleted, and stays correct when `next` races
/// with itself.
#[derive(Default)]
pub struct Monotonic {
    high_water: AtomicI64,
}

impl Monotonic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start above ids that already exist (e.g. loaded from storage)
    pub fn starting_at(high_water: RecordId) -> Self {
        Self {
            high_water: AtomicI64::new(high_water),
        }
    }
}

impl IdAllocator for Monotonic {
    fn next(&self, current_max: RecordId) -> RecordId {
        let mut observed = self.high_water.load(Ordering::Acquire);
        loop {
            let candidate = observed.max(current_max).max(0) + 1;
            match self.high_water.compare_exchange(
                observed,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => observed = actual,
            }
        }
    }
}

/// In-memory table over one entity kind
pub struct Table<T: Record> {
    entity: &'static str,
    rows: RwLock<Vec<T>>,
    ids: Box<dyn IdAllocator>,
}

impl<T: Record> Table<T> {
    /// Create an empty table with the [`Monotonic`] allocator
    pub fn new(entity: &'static str) -> Self {
        Self::with_allocator(entity, Monotonic::new())
    }

    /// Create an empty table with a specific id allocator
    pub fn with_allocator(entity: &'static str, ids: impl IdAllocator + 'static) -> Self {
        Self {
            entity,
            rows: RwLock::new(Vec::new()),
            ids: Box::new(ids),
        }
    }

    /// All records in insertion order
    pub async fn all(&self) -> Vec<T> {
        self.rows.read().await.clone()
    }

    /// The record with the given id, if present
    pub async fn get(&self, id: RecordId) -> Option<T> {
        self.rows.read().await.iter().find(|r| r.id() == id).cloned()
    }

    /// Store a record under a freshly allocated id and return the copy
    pub async fn create(&self, mut record: T) -> T {
        let mut rows = self.rows.write().await;
        let current_max = rows.iter().map(Record::id).max().unwrap_or(0);
        record.set_id(self.ids.next(current_max));
        rows.push(record.clone());
        debug!(entity = self.entity, id = record.id(), "record created");
        record
    }

    /// Merge a patch onto the stored record
    pub async fn update(&self, id: RecordId, patch: T::Patch) -> CoreResult<T> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(CoreError::NotFound {
                entity: self.entity,
                id,
            })?;
        row.apply(patch);
        Ok(row.clone())
    }

    /// Remove and return the record
    pub async fn delete(&self, id: RecordId) -> CoreResult<T> {
        let mut rows = self.rows.write().await;
        let index = rows
            .iter()
            .position(|r| r.id() == id)
            .ok_or(CoreError::NotFound {
                entity: self.entity,
                id,
            })?;
        let removed = rows.remove(index);
        debug!(entity = self.entity, id, "record deleted");
        Ok(removed)
    }

    /// Case-insensitive substring match across each record's declared
    /// search fields; results keep their original relative order
    pub async fn search(&self, query: &str) -> Vec<T> {
        let needle = query.to_lowercase();
        self.rows
            .read()
            .await
            .iter()
            .filter(|r| {
                r.search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Records matching a predicate, in insertion order
    pub async fn find(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Remove and return every record matching a predicate
    pub async fn delete_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let mut rows = self.rows.write().await;
        let mut removed = Vec::new();
        rows.retain(|r| {
            if predicate(r) {
                removed.push(r.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Verse {
        id: RecordId,
        text: String,
        reciter: String,
    }

    impl Verse {
        fn new(text: &str, reciter: &str) -> Self {
            Self {
                id: 0,
                text: text.to_string(),
                reciter: reciter.to_string(),
            }
        }
    }

    #[derive(Default)]
    struct VersePatch {
        text: Option<String>,
        reciter: Option<String>,
    }

    impl Record for Verse {
        type Patch = VersePatch;

        fn id(&self) -> RecordId {
            self.id
        }

        fn set_id(&mut self, id: RecordId) {
            self.id = id;
        }

        fn apply(&mut self, patch: VersePatch) {
            if let Some(text) = patch.text {
                self.text = text;
            }
            if let Some(reciter) = patch.reciter {
                self.reciter = reciter;
            }
        }

        fn search_fields(&self) -> Vec<&str> {
            vec![&self.text, &self.reciter]
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_equal_record() {
        let table = Table::new("verse");
        let created = table.create(Verse::new("alpha", "A")).await;
        assert_eq!(created.id, 1);

        let fetched = table.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_is_none_not_error() {
        let table: Table<Verse> = Table::new("verse");
        assert!(table.get(99).await.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_sequential_from_one() {
        let table = Table::new("verse");
        for expected in 1..=3 {
            let created = table.create(Verse::new("x", "y")).await;
            assert_eq!(created.id, expected);
        }
    }

    #[tokio::test]
    async fn test_deleted_id_is_never_reused() {
        let table = Table::new("verse");
        table.create(Verse::new("a", "r")).await;
        let second = table.create(Verse::new("b", "r")).await;
        assert_eq!(second.id, 2);

        table.delete(second.id).await.unwrap();
        assert!(table.get(second.id).await.is_none());

        let third = table.create(Verse::new("c", "r")).await;
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_max_scan_reproduces_reference_allocation() {
        let table = Table::with_allocator("verse", MaxScan);
        table.create(Verse::new("a", "r")).await;
        let second = table.create(Verse::new("b", "r")).await;

        // The reference scan hands the freed maximum out again
        table.delete(second.id).await.unwrap();
        let third = table.create(Verse::new("c", "r")).await;
        assert_eq!(third.id, 2);
    }

    #[tokio::test]
    async fn test_update_merges_and_preserves_unset_fields() {
        let table = Table::new("verse");
        let created = table.create(Verse::new("original", "Hafs")).await;

        let updated = table
            .update(
                created.id,
                VersePatch {
                    text: Some("revised".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.text, "revised");
        assert_eq!(updated.reciter, "Hafs");
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_fail_with_not_found() {
        let table: Table<Verse> = Table::new("verse");

        let err = table.update(5, VersePatch::default()).await.unwrap_err();
        assert!(err.is_not_found());

        let err = table.delete(5).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let table = Table::new("verse");
        table.create(Verse::new("Patience and Prayer", "A")).await;
        table.create(Verse::new("charity", "B")).await;
        table.create(Verse::new("On PATIENCE", "C")).await;

        let upper = table.search("PATIENCE").await;
        let lower = table.search("patience").await;
        assert_eq!(upper, lower);
        assert_eq!(upper.len(), 2);
        // Original relative order, no ranking
        assert_eq!(upper[0].reciter, "A");
        assert_eq!(upper[1].reciter, "C");
    }

    #[tokio::test]
    async fn test_search_covers_every_declared_field() {
        let table = Table::new("verse");
        table.create(Verse::new("text body", "Warsh")).await;

        assert_eq!(table.search("warsh").await.len(), 1);
        assert!(table.search("absent").await.is_empty());
    }

    #[tokio::test]
    async fn test_results_are_defensive_copies() {
        let table = Table::new("verse");
        let created = table.create(Verse::new("stable", "A")).await;

        let mut fetched = table.get(created.id).await.unwrap();
        fetched.text = "mutated".to_string();

        assert_eq!(table.get(created.id).await.unwrap().text, "stable");
    }

    #[tokio::test]
    async fn test_delete_where_removes_matches() {
        let table = Table::new("verse");
        table.create(Verse::new("keep", "A")).await;
        table.create(Verse::new("drop", "B")).await;
        table.create(Verse::new("drop", "C")).await;

        let removed = table.delete_where(|v| v.text == "drop").await;
        assert_eq!(removed.len(), 2);
        assert_eq!(table.len().await, 1);
    }

    #[test]
    fn test_monotonic_tracks_external_maximum() {
        let ids = Monotonic::starting_at(10);
        assert_eq!(ids.next(3), 11);
        assert_eq!(ids.next(25), 26);
        assert_eq!(ids.next(0), 27);
    }
}
