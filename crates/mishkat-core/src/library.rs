//! Corpus library: books, chapters, and hadith with read-time enrichment
//!
//! Holds one [`Table`] per entity kind and layers the cross-entity
//! rules on top: chapter numbering uniqueness, the configurable
//! cascade policy, and enrichment of hadith reads with parent names.
//!
//! Enrichment failures are non-fatal. A hadith whose book is gone is
//! still returned, with the `"Unknown Book"` sentinel; a missing
//! chapter just leaves the title absent.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::models::{
    Book, BookPatch, Chapter, ChapterPatch, EnrichedHadith, Hadith, HadithPatch,
};
use crate::table::{RecordId, Table};

/// Sentinel book name used when a hadith's parent book cannot be resolved
pub const UNKNOWN_BOOK: &str = "Unknown Book";

/// What happens to children when a book or chapter is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadePolicy {
    /// Children stay behind with dangling parent references
    #[default]
    Orphan,
    /// Children are deleted along with their parent
    Cascade,
}

/// In-memory store over the hadith corpus
pub struct Library {
    books: Table<Book>,
    chapters: Table<Chapter>,
    hadith: Table<Hadith>,
    cascade: CascadePolicy,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Self::with_policy(CascadePolicy::default())
    }

    pub fn with_policy(cascade: CascadePolicy) -> Self {
        Self {
            books: Table::new("book"),
            chapters: Table::new("chapter"),
            hadith: Table::new("hadith"),
            cascade,
        }
    }

    pub fn cascade_policy(&self) -> CascadePolicy {
        self.cascade
    }

    // ==================== Book Operations ====================

    /// All books in insertion order
    pub async fn books(&self) -> Vec<Book> {
        self.books.all().await
    }

    pub async fn book(&self, id: RecordId) -> Option<Book> {
        self.books.get(id).await
    }

    pub async fn create_book(&self, book: Book) -> Book {
        self.books.create(book).await
    }

    pub async fn update_book(&self, id: RecordId, patch: BookPatch) -> CoreResult<Book> {
        self.books.update(id, patch).await
    }

    /// Delete a book, applying the configured cascade policy to its
    /// chapters and hadith
    pub async fn delete_book(&self, id: RecordId) -> CoreResult<Book> {
        let book = self.books.delete(id).await?;
        if self.cascade == CascadePolicy::Cascade {
            let chapters = self.chapters.delete_where(|c| c.book_id == id).await;
            let hadith = self.hadith.delete_where(|h| h.book_id == id).await;
            debug!(
                book = id,
                chapters = chapters.len(),
                hadith = hadith.len(),
                "cascaded book delete"
            );
        }
        Ok(book)
    }

    /// Case-insensitive search over both name scripts and the author
    pub async fn search_books(&self, query: &str) -> Vec<Book> {
        self.books.search(query).await
    }

    // ==================== Chapter Operations ====================

    pub async fn chapter(&self, id: RecordId) -> Option<Chapter> {
        self.chapters.get(id).await
    }

    /// Chapters of a book, ordered by their position in the book
    pub async fn chapters_for_book(&self, book_id: RecordId) -> Vec<Chapter> {
        let mut chapters = self.chapters.find(|c| c.book_id == book_id).await;
        chapters.sort_by_key(|c| c.number_in_book);
        chapters
    }

    pub async fn create_chapter(&self, chapter: Chapter) -> CoreResult<Chapter> {
        self.ensure_number_free(chapter.book_id, chapter.number_in_book, None)
            .await?;
        Ok(self.chapters.create(chapter).await)
    }

    pub async fn update_chapter(&self, id: RecordId, patch: ChapterPatch) -> CoreResult<Chapter> {
        if patch.number_in_book.is_some() || patch.book_id.is_some() {
            let existing = self
                .chapters
                .get(id)
                .await
                .ok_or(CoreError::NotFound { entity: "chapter", id })?;
            let book_id = patch.book_id.unwrap_or(existing.book_id);
            let number = patch.number_in_book.unwrap_or(existing.number_in_book);
            self.ensure_number_free(book_id, number, Some(id)).await?;
        }
        self.chapters.update(id, patch).await
    }

    /// Delete a chapter, applying the configured cascade policy to its
    /// hadith
    pub async fn delete_chapter(&self, id: RecordId) -> CoreResult<Chapter> {
        let chapter = self.chapters.delete(id).await?;
        if self.cascade == CascadePolicy::Cascade {
            let hadith = self.hadith.delete_where(|h| h.chapter_id == id).await;
            debug!(chapter = id, hadith = hadith.len(), "cascaded chapter delete");
        }
        Ok(chapter)
    }

    async fn ensure_number_free(
        &self,
        book_id: RecordId,
        number: u32,
        exclude: Option<RecordId>,
    ) -> CoreResult<()> {
        let taken = self
            .chapters
            .find(|c| {
                c.book_id == book_id
                    && c.number_in_book == number
                    && Some(c.id) != exclude
            })
            .await;
        if taken.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ChapterNumberTaken { book_id, number })
        }
    }

    // ==================== Hadith Operations ====================

    pub async fn create_hadith(&self, hadith: Hadith) -> Hadith {
        self.hadith.create(hadith).await
    }

    pub async fn update_hadith(&self, id: RecordId, patch: HadithPatch) -> CoreResult<Hadith> {
        self.hadith.update(id, patch).await
    }

    pub async fn delete_hadith(&self, id: RecordId) -> CoreResult<Hadith> {
        self.hadith.delete(id).await
    }

    /// One hadith with its parent names resolved
    pub async fn hadith(&self, id: RecordId) -> Option<EnrichedHadith> {
        match self.hadith.get(id).await {
            Some(hadith) => Some(self.enrich(hadith).await),
            None => None,
        }
    }

    /// Hadith of a chapter, enriched and ordered by display number
    pub async fn hadith_for_chapter(&self, chapter_id: RecordId) -> Vec<EnrichedHadith> {
        let rows = self.hadith.find(|h| h.chapter_id == chapter_id).await;
        self.enrich_sorted(rows).await
    }

    /// Case-insensitive search over both script texts and the narrator,
    /// enriched and ordered by display number
    pub async fn search_hadith(&self, query: &str) -> Vec<EnrichedHadith> {
        let rows = self.hadith.search(query).await;
        self.enrich_sorted(rows).await
    }

    async fn enrich_sorted(&self, rows: Vec<Hadith>) -> Vec<EnrichedHadith> {
        let mut enriched = Vec::with_capacity(rows.len());
        for hadith in rows {
            enriched.push(self.enrich(hadith).await);
        }
        enriched.sort_by_key(|e| e.hadith.number);
        enriched
    }

    async fn enrich(&self, hadith: Hadith) -> EnrichedHadith {
        let book_name = match self.books.get(hadith.book_id).await {
            Some(book) => book.name_urdu,
            None => {
                warn!(
                    hadith = hadith.id,
                    book = hadith.book_id,
                    "parent book missing, degrading to sentinel"
                );
                UNKNOWN_BOOK.to_string()
            }
        };
        let chapter_title = self
            .chapters
            .get(hadith.chapter_id)
            .await
            .map(|c| c.title_urdu);

        EnrichedHadith {
            hadith,
            book_name,
            chapter_title,
        }
    }
}
