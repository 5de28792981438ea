//! Mishkat Core Library
//!
//! This crate provides the core functionality for Mishkat, a hadith
//! study application: browsing a corpus of books, chapters, and
//! narrations; bookmarking; and a study timer with a session log.
//!
//! # Architecture
//!
//! All corpus data is served from in-memory tables behind an async
//! calling contract, so the backing store can later move behind a real
//! remote boundary without touching callers. User state (bookmarks,
//! timer sessions, preferences) persists write-through to a durable
//! key/value surface backed by SQLite.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open().await?;
//!
//! // Browse and search
//! let books = store.books().await;
//! let results = store.search_hadith("intention").await;
//!
//! // Study
//! store.start_timer(SessionGoal::pomodoro()).await?;
//! let stats = store.statistics().await;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `library`: Books, chapters, and hadith with read-time enrichment
//! - `table`: Generic in-memory table with pluggable id allocation
//! - `bookmarks`: Persisted bookmark set
//! - `timer`: Study timer state machine
//! - `sessions`: Persisted session log and statistics
//! - `prefs`: User preference scalars
//! - `storage`: Durable key/value surface
//! - `config`: Application configuration

pub mod bookmarks;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod prefs;
pub mod sessions;
pub mod storage;
pub mod store;
pub mod table;
pub mod timer;

pub use bookmarks::{BookmarkSet, NewBookmark};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use library::{CascadePolicy, Library, UNKNOWN_BOOK};
pub use models::{
    Book, BookPatch, Bookmark, Chapter, ChapterPatch, EnrichedHadith, GoalType, Grade, Hadith,
    HadithPatch, SessionPatch, StudySession,
};
pub use prefs::{Language, Preferences, Theme};
pub use sessions::{NewSession, SessionLog, TimerStatistics};
pub use storage::{KeyValueStore, MemoryKv, SqliteKv, StorageError, StorageResult};
pub use store::Store;
pub use table::{IdAllocator, MaxScan, Monotonic, Record, RecordId, Table};
pub use timer::{SessionGoal, TimerEngine, TimerState};
