//! Persisted bookmark set
//!
//! A keyed set over hadith ids. Every mutation updates memory first,
//! then writes the whole set back through the durable surface under
//! [`keys::BOOKMARKS`]. There is no rollback: a persistence failure
//! after the in-memory change is surfaced to the caller, who should
//! re-read before retrying.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::models::Bookmark;
use crate::storage::{keys, KeyValueStore, StorageResult};
use crate::table::{IdAllocator, Monotonic, RecordId};

/// Input for [`BookmarkSet::add`]
#[derive(Debug, Clone, Default)]
pub struct NewBookmark {
    pub hadith_id: RecordId,
    /// Defaults to now when absent
    pub date_added: Option<DateTime<Utc>>,
    /// Defaults to empty when absent
    pub note: Option<String>,
}

impl NewBookmark {
    pub fn new(hadith_id: RecordId) -> Self {
        Self {
            hadith_id,
            ..Default::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The user's saved hadith, persisted write-through
pub struct BookmarkSet {
    kv: Arc<dyn KeyValueStore>,
    ids: Monotonic,
    entries: RwLock<Vec<Bookmark>>,
}

impl BookmarkSet {
    /// Load the set from the durable surface; an absent key yields an
    /// empty set
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> StorageResult<Self> {
        let entries: Vec<Bookmark> = kv.get_json(keys::BOOKMARKS).await?.unwrap_or_default();
        let high_water = entries.iter().map(|b| b.id).max().unwrap_or(0);
        debug!(count = entries.len(), "loaded bookmark set");
        Ok(Self {
            kv,
            ids: Monotonic::starting_at(high_water),
            entries: RwLock::new(entries),
        })
    }

    /// All bookmarks in insertion order
    pub async fn all(&self) -> Vec<Bookmark> {
        self.read().clone()
    }

    /// Synchronous existence check; never suspends, so UI state can be
    /// initialized without a round trip
    pub fn contains(&self, hadith_id: RecordId) -> bool {
        self.read().iter().any(|b| b.hadith_id == hadith_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Add a bookmark for a hadith
    ///
    /// At most one bookmark per hadith: a second add for the same
    /// `hadith_id` is rejected rather than silently duplicated.
    pub async fn add(&self, new: NewBookmark) -> CoreResult<Bookmark> {
        let bookmark = {
            let mut entries = self.write();
            if entries.iter().any(|b| b.hadith_id == new.hadith_id) {
                return Err(CoreError::DuplicateBookmark {
                    hadith_id: new.hadith_id,
                });
            }
            let current_max = entries.iter().map(|b| b.id).max().unwrap_or(0);
            let bookmark = Bookmark {
                id: self.ids.next(current_max),
                hadith_id: new.hadith_id,
                date_added: new.date_added.unwrap_or_else(Utc::now),
                note: new.note.unwrap_or_default(),
            };
            entries.push(bookmark.clone());
            bookmark
        };
        self.persist().await?;
        debug!(hadith = bookmark.hadith_id, "bookmark added");
        Ok(bookmark)
    }

    /// Remove the first bookmark matching the hadith id (not the
    /// bookmark id)
    pub async fn remove(&self, hadith_id: RecordId) -> CoreResult<Bookmark> {
        let removed = {
            let mut entries = self.write();
            let index = entries
                .iter()
                .position(|b| b.hadith_id == hadith_id)
                .ok_or(CoreError::NotFound {
                    entity: "bookmark for hadith",
                    id: hadith_id,
                })?;
            entries.remove(index)
        };
        self.persist().await?;
        debug!(hadith = hadith_id, "bookmark removed");
        Ok(removed)
    }

    /// Replace the note on the first bookmark matching the hadith id
    pub async fn update_note(
        &self,
        hadith_id: RecordId,
        note: impl Into<String>,
    ) -> CoreResult<Bookmark> {
        let updated = {
            let mut entries = self.write();
            let entry = entries
                .iter_mut()
                .find(|b| b.hadith_id == hadith_id)
                .ok_or(CoreError::NotFound {
                    entity: "bookmark for hadith",
                    id: hadith_id,
                })?;
            entry.note = note.into();
            entry.clone()
        };
        self.persist().await?;
        Ok(updated)
    }

    /// Empty the set
    pub async fn clear(&self) -> CoreResult<()> {
        self.write().clear();
        self.persist().await?;
        debug!("bookmark set cleared");
        Ok(())
    }

    async fn persist(&self) -> StorageResult<()> {
        let snapshot = self.read().clone();
        self.kv.set_json(keys::BOOKMARKS, &snapshot).await
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Bookmark>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Bookmark>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKv, StorageError};

    async fn empty_set() -> (Arc<MemoryKv>, BookmarkSet) {
        let kv = Arc::new(MemoryKv::new());
        let set = BookmarkSet::load(Arc::clone(&kv) as Arc<dyn KeyValueStore>)
            .await
            .unwrap();
        (kv, set)
    }

    #[tokio::test]
    async fn test_contains_tracks_add_and_remove() {
        let (_kv, set) = empty_set().await;

        assert!(!set.contains(100));
        set.add(NewBookmark::new(100)).await.unwrap();
        assert!(set.contains(100));

        set.remove(100).await.unwrap();
        assert!(!set.contains(100));
    }

    #[tokio::test]
    async fn test_add_defaults_date_and_note() {
        let (_kv, set) = empty_set().await;

        let bookmark = set.add(NewBookmark::new(7)).await.unwrap();
        assert_eq!(bookmark.id, 1);
        assert_eq!(bookmark.hadith_id, 7);
        assert!(bookmark.note.is_empty());
        assert!(Utc::now() - bookmark.date_added < chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_duplicate_bookmark_rejected() {
        let (_kv, set) = empty_set().await;
        set.add(NewBookmark::new(7)).await.unwrap();

        let err = set.add(NewBookmark::new(7).with_note("again")).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateBookmark { hadith_id: 7 }));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let (_kv, set) = empty_set().await;
        let err = set.remove(7).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_note() {
        let (_kv, set) = empty_set().await;
        set.add(NewBookmark::new(7)).await.unwrap();

        let updated = set.update_note(7, "review friday").await.unwrap();
        assert_eq!(updated.note, "review friday");

        let err = set.update_note(8, "x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mutations_write_through_to_storage() {
        let (kv, set) = empty_set().await;
        set.add(NewBookmark::new(1)).await.unwrap();
        set.add(NewBookmark::new(2).with_note("note")).await.unwrap();

        // A fresh set loaded from the same surface sees the writes
        let reloaded = BookmarkSet::load(Arc::clone(&kv) as Arc<dyn KeyValueStore>)
            .await
            .unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(1));
        assert!(reloaded.contains(2));
    }

    #[tokio::test]
    async fn test_loaded_set_does_not_reuse_ids() {
        let (kv, set) = empty_set().await;
        let first = set.add(NewBookmark::new(1)).await.unwrap();
        assert_eq!(first.id, 1);

        let reloaded = BookmarkSet::load(Arc::clone(&kv) as Arc<dyn KeyValueStore>)
            .await
            .unwrap();
        reloaded.remove(1).await.unwrap();
        let next = reloaded.add(NewBookmark::new(2)).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_clear_empties_set_and_storage() {
        let (kv, set) = empty_set().await;
        set.add(NewBookmark::new(1)).await.unwrap();
        set.clear().await.unwrap();

        assert!(set.is_empty());
        let reloaded = BookmarkSet::load(Arc::clone(&kv) as Arc<dyn KeyValueStore>)
            .await
            .unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces_but_memory_keeps_mutation() {
        let (kv, set) = empty_set().await;
        kv.fail_writes(true);

        let err = set.add(NewBookmark::new(7)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Storage(StorageError::Unavailable(_))
        ));

        // In-memory state is ahead of storage; callers must re-read
        assert!(set.contains(7));
    }
}
