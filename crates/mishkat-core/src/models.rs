//! Data models for Mishkat
//!
//! Defines the corpus entities (Book, Chapter, Hadith), the user-facing
//! Bookmark and StudySession records, and the typed patches used for
//! partial updates.
//!
//! Serialized field names keep the original deployment's JSON casing
//! (`Id`, `bookId`, `nameUrdu`, ...) so data already on the durable
//! surface remains readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::table::{Record, RecordId};

/// A top-level hadith collection (e.g. Sahih al-Bukhari)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier
    #[serde(rename = "Id")]
    pub id: RecordId,
    /// Display name in Urdu script
    pub name_urdu: String,
    /// Display name in Arabic script
    pub name_arabic: String,
    /// Compiler of the collection
    pub author: String,
    /// Short description
    pub description: String,
    /// Number of hadith in the collection
    pub total_hadith: u32,
}

impl Book {
    /// Create a new book; the id is assigned when the book is stored
    pub fn new(
        name_urdu: impl Into<String>,
        name_arabic: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            name_urdu: name_urdu.into(),
            name_arabic: name_arabic.into(),
            author: author.into(),
            description: String::new(),
            total_hadith: 0,
        }
    }
}

/// Partial update for a [`Book`]; unset fields are preserved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub name_urdu: Option<String>,
    pub name_arabic: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub total_hadith: Option<u32>,
}

impl Record for Book {
    type Patch = BookPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn apply(&mut self, patch: BookPatch) {
        if let Some(name_urdu) = patch.name_urdu {
            self.name_urdu = name_urdu;
        }
        if let Some(name_arabic) = patch.name_arabic {
            self.name_arabic = name_arabic;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(total_hadith) = patch.total_hadith {
            self.total_hadith = total_hadith;
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.name_urdu, &self.name_arabic, &self.author]
    }
}

/// An ordered subdivision of a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Unique identifier
    #[serde(rename = "Id")]
    pub id: RecordId,
    /// Parent book
    pub book_id: RecordId,
    /// Position within the book; unique per book, defines display order
    pub number_in_book: u32,
    /// Title in Urdu script
    pub title_urdu: String,
    /// Title in Arabic script
    pub title_arabic: String,
}

impl Chapter {
    /// Create a new chapter; the id is assigned when the chapter is stored
    pub fn new(
        book_id: RecordId,
        number_in_book: u32,
        title_urdu: impl Into<String>,
        title_arabic: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            book_id,
            number_in_book,
            title_urdu: title_urdu.into(),
            title_arabic: title_arabic.into(),
        }
    }
}

/// Partial update for a [`Chapter`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPatch {
    pub book_id: Option<RecordId>,
    pub number_in_book: Option<u32>,
    pub title_urdu: Option<String>,
    pub title_arabic: Option<String>,
}

impl Record for Chapter {
    type Patch = ChapterPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn apply(&mut self, patch: ChapterPatch) {
        if let Some(book_id) = patch.book_id {
            self.book_id = book_id;
        }
        if let Some(number_in_book) = patch.number_in_book {
            self.number_in_book = number_in_book;
        }
        if let Some(title_urdu) = patch.title_urdu {
            self.title_urdu = title_urdu;
        }
        if let Some(title_arabic) = patch.title_arabic {
            self.title_arabic = title_arabic;
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.title_urdu, &self.title_arabic]
    }
}

/// Authenticity grading of a hadith
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Grade {
    Sahih,
    Hasan,
    Daif,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Sahih => "Sahih",
            Grade::Hasan => "Hasan",
            Grade::Daif => "Daif",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The atomic text record: one narration with dual-script text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hadith {
    /// Unique identifier
    #[serde(rename = "Id")]
    pub id: RecordId,
    /// Parent book
    pub book_id: RecordId,
    /// Parent chapter
    pub chapter_id: RecordId,
    /// Display number; defines order within the chapter
    pub number: u32,
    /// Text in Arabic script
    pub arabic_text: String,
    /// Text in Urdu script
    pub urdu_text: String,
    /// Chain-of-narration source
    pub narrator: String,
    /// Authenticity classification
    pub grade: Grade,
}

impl Hadith {
    /// Create a new hadith; the id is assigned when the record is stored
    pub fn new(book_id: RecordId, chapter_id: RecordId, number: u32) -> Self {
        Self {
            id: 0,
            book_id,
            chapter_id,
            number,
            arabic_text: String::new(),
            urdu_text: String::new(),
            narrator: String::new(),
            grade: Grade::Sahih,
        }
    }
}

/// Partial update for a [`Hadith`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HadithPatch {
    pub book_id: Option<RecordId>,
    pub chapter_id: Option<RecordId>,
    pub number: Option<u32>,
    pub arabic_text: Option<String>,
    pub urdu_text: Option<String>,
    pub narrator: Option<String>,
    pub grade: Option<Grade>,
}

impl Record for Hadith {
    type Patch = HadithPatch;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn apply(&mut self, patch: HadithPatch) {
        if let Some(book_id) = patch.book_id {
            self.book_id = book_id;
        }
        if let Some(chapter_id) = patch.chapter_id {
            self.chapter_id = chapter_id;
        }
        if let Some(number) = patch.number {
            self.number = number;
        }
        if let Some(arabic_text) = patch.arabic_text {
            self.arabic_text = arabic_text;
        }
        if let Some(urdu_text) = patch.urdu_text {
            self.urdu_text = urdu_text;
        }
        if let Some(narrator) = patch.narrator {
            self.narrator = narrator;
        }
        if let Some(grade) = patch.grade {
            self.grade = grade;
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.arabic_text, &self.urdu_text, &self.narrator]
    }
}

/// A hadith with its parent names resolved at read time
///
/// `book_name` and `chapter_title` are computed on every read and never
/// persisted on the record itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedHadith {
    #[serde(flatten)]
    pub hadith: Hadith,
    /// Urdu name of the parent book, or the "Unknown Book" sentinel
    pub book_name: String,
    /// Urdu title of the parent chapter, absent if the chapter is gone
    pub chapter_title: Option<String>,
}

/// A saved reference from the user to a hadith
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Unique identifier, allocated independently of hadith ids
    #[serde(rename = "Id")]
    pub id: RecordId,
    /// The bookmarked hadith; stale references are tolerated
    pub hadith_id: RecordId,
    /// When the bookmark was created
    pub date_added: DateTime<Utc>,
    /// Free-text note
    pub note: String,
}

/// Kind of study goal backing a timer session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Pomodoro,
    Short,
    Long,
    Custom,
}

impl GoalType {
    /// Preset goal length in minutes; `None` for custom goals
    pub fn preset_minutes(&self) -> Option<u32> {
        match self {
            GoalType::Pomodoro => Some(25),
            GoalType::Short => Some(15),
            GoalType::Long => Some(45),
            GoalType::Custom => None,
        }
    }
}

/// A finalized record of one study interval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    /// Unique identifier, from the monotonic session counter
    #[serde(rename = "Id")]
    pub id: RecordId,
    /// Elapsed whole seconds
    pub duration: u64,
    /// Goal length in minutes
    pub goal_minutes: u32,
    /// Kind of goal the session was run against
    pub goal_type: GoalType,
    /// Whether the goal was reached when the session was finalized
    pub completed: bool,
    /// When the timer was started
    pub start_time: DateTime<Utc>,
    /// When the session was finalized
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a [`StudySession`]
///
/// Carries no id field, so an update can never renumber a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub duration: Option<u64>,
    pub goal_minutes: Option<u32>,
    pub goal_type: Option<GoalType>,
    pub completed: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl StudySession {
    /// Apply a patch; unset fields are preserved
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(goal_minutes) = patch.goal_minutes {
            self.goal_minutes = goal_minutes;
        }
        if let Some(goal_type) = patch.goal_type {
            self.goal_type = goal_type;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_new() {
        let book = Book::new("صحیح بخاری", "صحيح البخاري", "Imam Bukhari");
        assert_eq!(book.id, 0);
        assert_eq!(book.author, "Imam Bukhari");
        assert!(book.description.is_empty());
        assert_eq!(book.total_hadith, 0);
    }

    #[test]
    fn test_book_patch_preserves_unset_fields() {
        let mut book = Book::new("Bukhari", "البخاري", "Imam Bukhari");
        book.description = "The most authentic collection".to_string();

        book.apply(BookPatch {
            author: Some("Muhammad al-Bukhari".to_string()),
            ..Default::default()
        });

        assert_eq!(book.author, "Muhammad al-Bukhari");
        assert_eq!(book.name_urdu, "Bukhari");
        assert_eq!(book.description, "The most authentic collection");
    }

    #[test]
    fn test_chapter_search_fields() {
        let chapter = Chapter::new(1, 3, "وحی کی ابتدا", "بدء الوحي");
        assert_eq!(chapter.search_fields().len(), 2);
        assert_eq!(chapter.number_in_book, 3);
    }

    #[test]
    fn test_grade_display() {
        assert_eq!(Grade::Sahih.to_string(), "Sahih");
        assert_eq!(Grade::Hasan.as_str(), "Hasan");
    }

    #[test]
    fn test_goal_type_presets() {
        assert_eq!(GoalType::Pomodoro.preset_minutes(), Some(25));
        assert_eq!(GoalType::Short.preset_minutes(), Some(15));
        assert_eq!(GoalType::Long.preset_minutes(), Some(45));
        assert_eq!(GoalType::Custom.preset_minutes(), None);
    }

    #[test]
    fn test_hadith_serialization_uses_original_casing() {
        let mut hadith = Hadith::new(1, 10, 7);
        hadith.id = 100;
        hadith.narrator = "Abu Huraira".to_string();

        let json = serde_json::to_value(&hadith).unwrap();
        assert_eq!(json["Id"], 100);
        assert_eq!(json["bookId"], 1);
        assert_eq!(json["chapterId"], 10);
        assert_eq!(json["narrator"], "Abu Huraira");
        assert_eq!(json["grade"], "Sahih");

        let back: Hadith = serde_json::from_value(json).unwrap();
        assert_eq!(back, hadith);
    }

    #[test]
    fn test_enriched_hadith_flattens_record_fields() {
        let mut hadith = Hadith::new(1, 10, 1);
        hadith.id = 100;
        let enriched = EnrichedHadith {
            hadith,
            book_name: "Bukhari".to_string(),
            chapter_title: None,
        };

        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["Id"], 100);
        assert_eq!(json["bookName"], "Bukhari");
        assert!(json["chapterTitle"].is_null());
    }

    #[test]
    fn test_session_patch_cannot_touch_id() {
        let now = Utc::now();
        let mut session = StudySession {
            id: 4,
            duration: 300,
            goal_minutes: 25,
            goal_type: GoalType::Pomodoro,
            completed: false,
            start_time: now,
            end_time: now,
            created_at: now,
            updated_at: now,
        };

        session.apply(SessionPatch {
            duration: Some(600),
            completed: Some(true),
            ..Default::default()
        });

        assert_eq!(session.id, 4);
        assert_eq!(session.duration, 600);
        assert!(session.completed);
        assert_eq!(session.goal_minutes, 25);
    }

    #[test]
    fn test_bookmark_serialization_roundtrip() {
        let bookmark = Bookmark {
            id: 2,
            hadith_id: 100,
            date_added: Utc::now(),
            note: "revisit".to_string(),
        };

        let json = serde_json::to_string(&bookmark).unwrap();
        assert!(json.contains("\"hadithId\":100"));
        let back: Bookmark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bookmark);
    }
}
