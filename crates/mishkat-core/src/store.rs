//! Unified storage interface
//!
//! The `Store` is the same-process API surface the UI shell calls
//! into. It assembles the library, bookmark set, session log, timer
//! engine, and preferences over one shared durable key/value handle.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open().await?;  // Creates or loads existing
//!
//! // Browse
//! let books = store.books().await;
//! let results = store.search_hadith("patience").await;
//!
//! // Study
//! store.start_timer(SessionGoal::pomodoro()).await?;
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::bookmarks::{BookmarkSet, NewBookmark};
use crate::config::Config;
use crate::library::Library;
use crate::models::{
    Book, BookPatch, Bookmark, Chapter, ChapterPatch, EnrichedHadith, Hadith, HadithPatch,
    SessionPatch, StudySession,
};
use crate::prefs::Preferences;
use crate::sessions::{SessionLog, TimerStatistics};
use crate::storage::{KeyValueStore, SqliteKv};
use crate::table::RecordId;
use crate::timer::{SessionGoal, TimerEngine, TimerState};

/// Unified storage interface for Mishkat
pub struct Store {
    config: Config,
    kv: Arc<dyn KeyValueStore>,
    library: Library,
    bookmarks: BookmarkSet,
    sessions: Arc<SessionLog>,
    timer: TimerEngine,
    prefs: Preferences,
}

impl Store {
    /// Open the store, creating the backing database if none exists
    pub async fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).await
    }

    /// Open the store with a specific configuration
    pub async fn open_with_config(config: Config) -> Result<Self> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(
            SqliteKv::open(config.database_path())
                .context("Failed to open key/value database")?,
        );
        Self::assemble(config, kv).await
    }

    /// Open the store over an injected key/value surface
    ///
    /// Tests typically pass a `MemoryKv`.
    pub async fn with_kv(kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::assemble(Config::default(), kv).await
    }

    async fn assemble(config: Config, kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let library = Library::with_policy(config.cascade_policy);
        let bookmarks = BookmarkSet::load(Arc::clone(&kv))
            .await
            .context("Failed to load bookmarks")?;
        let sessions = Arc::new(
            SessionLog::load(Arc::clone(&kv))
                .await
                .context("Failed to load timer sessions")?,
        );
        let timer = TimerEngine::new(Arc::clone(&sessions));
        let prefs = Preferences::new(Arc::clone(&kv));

        info!(
            bookmarks = bookmarks.len(),
            cascade = ?config.cascade_policy,
            "store opened"
        );

        Ok(Self {
            config,
            kv,
            library,
            bookmarks,
            sessions,
            timer,
            prefs,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The durable key/value handle the store was opened over
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    // ==================== Book Operations ====================

    pub async fn books(&self) -> Vec<Book> {
        self.library.books().await
    }

    pub async fn book(&self, id: RecordId) -> Option<Book> {
        self.library.book(id).await
    }

    pub async fn create_book(&self, book: Book) -> Book {
        self.library.create_book(book).await
    }

    pub async fn update_book(&self, id: RecordId, patch: BookPatch) -> Result<Book> {
        self.library
            .update_book(id, patch)
            .await
            .context("Failed to update book")
    }

    pub async fn delete_book(&self, id: RecordId) -> Result<Book> {
        self.library
            .delete_book(id)
            .await
            .context("Failed to delete book")
    }

    pub async fn search_books(&self, query: &str) -> Vec<Book> {
        self.library.search_books(query).await
    }

    // ==================== Chapter Operations ====================

    pub async fn chapters_for_book(&self, book_id: RecordId) -> Vec<Chapter> {
        self.library.chapters_for_book(book_id).await
    }

    pub async fn create_chapter(&self, chapter: Chapter) -> Result<Chapter> {
        self.library
            .create_chapter(chapter)
            .await
            .context("Failed to create chapter")
    }

    pub async fn update_chapter(&self, id: RecordId, patch: ChapterPatch) -> Result<Chapter> {
        self.library
            .update_chapter(id, patch)
            .await
            .context("Failed to update chapter")
    }

    pub async fn delete_chapter(&self, id: RecordId) -> Result<Chapter> {
        self.library
            .delete_chapter(id)
            .await
            .context("Failed to delete chapter")
    }

    // ==================== Hadith Operations ====================

    pub async fn hadith(&self, id: RecordId) -> Option<EnrichedHadith> {
        self.library.hadith(id).await
    }

    pub async fn hadith_for_chapter(&self, chapter_id: RecordId) -> Vec<EnrichedHadith> {
        self.library.hadith_for_chapter(chapter_id).await
    }

    pub async fn search_hadith(&self, query: &str) -> Vec<EnrichedHadith> {
        self.library.search_hadith(query).await
    }

    pub async fn create_hadith(&self, hadith: Hadith) -> Hadith {
        self.library.create_hadith(hadith).await
    }

    pub async fn update_hadith(&self, id: RecordId, patch: HadithPatch) -> Result<Hadith> {
        self.library
            .update_hadith(id, patch)
            .await
            .context("Failed to update hadith")
    }

    pub async fn delete_hadith(&self, id: RecordId) -> Result<Hadith> {
        self.library
            .delete_hadith(id)
            .await
            .context("Failed to delete hadith")
    }

    // ==================== Bookmark Operations ====================

    pub async fn bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.all().await
    }

    pub async fn add_bookmark(&self, new: NewBookmark) -> Result<Bookmark> {
        self.bookmarks
            .add(new)
            .await
            .context("Failed to add bookmark")
    }

    pub async fn remove_bookmark(&self, hadith_id: RecordId) -> Result<Bookmark> {
        self.bookmarks
            .remove(hadith_id)
            .await
            .context("Failed to remove bookmark")
    }

    pub async fn update_bookmark_note(
        &self,
        hadith_id: RecordId,
        note: impl Into<String>,
    ) -> Result<Bookmark> {
        self.bookmarks
            .update_note(hadith_id, note)
            .await
            .context("Failed to update bookmark note")
    }

    /// Synchronous existence check for immediate UI state
    pub fn is_bookmarked(&self, hadith_id: RecordId) -> bool {
        self.bookmarks.contains(hadith_id)
    }

    pub async fn clear_bookmarks(&self) -> Result<()> {
        self.bookmarks
            .clear()
            .await
            .context("Failed to clear bookmarks")
    }

    // ==================== Timer Operations ====================

    pub async fn start_timer(&self, goal: SessionGoal) -> Result<()> {
        self.timer.start(goal).await.context("Failed to start timer")
    }

    pub async fn pause_timer(&self) -> Result<()> {
        self.timer.pause().await.context("Failed to pause timer")
    }

    pub async fn resume_timer(&self) -> Result<()> {
        self.timer.resume().await.context("Failed to resume timer")
    }

    /// Stop the timer; returns the recorded session, if any elapsed
    pub async fn stop_timer(&self) -> Result<Option<StudySession>> {
        self.timer.stop().await.context("Failed to stop timer")
    }

    pub async fn reset_timer(&self) {
        self.timer.reset().await;
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn timer_elapsed(&self) -> u64 {
        self.timer.elapsed()
    }

    // ==================== Session Operations ====================

    /// All recorded sessions, most recently started first
    pub async fn sessions(&self) -> Vec<StudySession> {
        self.sessions.all().await
    }

    pub async fn session(&self, id: RecordId) -> Result<StudySession> {
        self.sessions.get(id).await.context("Failed to get session")
    }

    pub async fn update_session(&self, id: RecordId, patch: SessionPatch) -> Result<StudySession> {
        self.sessions
            .update(id, patch)
            .await
            .context("Failed to update session")
    }

    pub async fn delete_session(&self, id: RecordId) -> Result<StudySession> {
        self.sessions
            .delete(id)
            .await
            .context("Failed to delete session")
    }

    pub async fn statistics(&self) -> TimerStatistics {
        self.sessions.statistics().await
    }

    // ==================== Advanced ====================

    /// Direct access to the corpus library
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Direct access to the bookmark set
    pub fn bookmark_set(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    /// Direct access to the session log
    pub fn session_log(&self) -> &Arc<SessionLog> {
        &self.sessions
    }

    /// Direct access to the timer engine
    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    /// Typed preference accessors
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }
}
