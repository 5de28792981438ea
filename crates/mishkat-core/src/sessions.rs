//! Study session log
//!
//! Finalized timer sessions, persisted write-through under
//! [`keys::TIMER_SESSIONS`]. Session ids come from a monotonic counter
//! on the durable surface ([`keys::TIMER_ID_COUNTER`]) so they survive
//! restarts and deletions without reuse.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::models::{GoalType, SessionPatch, StudySession};
use crate::storage::{keys, KeyValueStore, StorageResult};
use crate::table::RecordId;

/// Input for [`SessionLog::create`]
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Elapsed whole seconds
    pub duration: u64,
    pub goal_minutes: u32,
    pub goal_type: GoalType,
    pub completed: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Aggregate statistics over the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatistics {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    /// Sum of all session durations, in seconds
    pub total_duration: u64,
    /// Mean session duration in seconds; 0 when the log is empty
    pub average_session: f64,
    /// Sessions started within the trailing 7 days
    pub week_sessions: usize,
    /// Duration of sessions started within the trailing 7 days
    pub week_duration: u64,
    /// Completed share as a percentage; 0 when the log is empty
    pub completion_rate: f64,
}

/// Persisted log of finalized study sessions
pub struct SessionLog {
    kv: Arc<dyn KeyValueStore>,
    sessions: RwLock<Vec<StudySession>>,
}

impl SessionLog {
    /// Load the log from the durable surface; an absent key yields an
    /// empty log
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> StorageResult<Self> {
        let sessions: Vec<StudySession> =
            kv.get_json(keys::TIMER_SESSIONS).await?.unwrap_or_default();
        debug!(count = sessions.len(), "loaded session log");
        Ok(Self {
            kv,
            sessions: RwLock::new(sessions),
        })
    }

    /// Record a finalized session
    pub async fn create(&self, new: NewSession) -> CoreResult<StudySession> {
        validate_goal_minutes(new.goal_minutes)?;
        validate_interval(new.start_time, new.end_time)?;

        let id = self.next_id().await?;
        let now = Utc::now();
        let session = StudySession {
            id,
            duration: new.duration,
            goal_minutes: new.goal_minutes,
            goal_type: new.goal_type,
            completed: new.completed,
            start_time: new.start_time,
            end_time: new.end_time,
            created_at: now,
            updated_at: now,
        };
        self.write().push(session.clone());
        self.persist().await?;
        debug!(
            id,
            duration = session.duration,
            completed = session.completed,
            "session recorded"
        );
        Ok(session)
    }

    /// All sessions, most recently started first
    pub async fn all(&self) -> Vec<StudySession> {
        let mut sessions = self.read().clone();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sessions
    }

    /// One session by id
    pub async fn get(&self, id: RecordId) -> CoreResult<StudySession> {
        self.read()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "session",
                id,
            })
    }

    /// Merge a patch onto a session; the id cannot change
    pub async fn update(&self, id: RecordId, patch: SessionPatch) -> CoreResult<StudySession> {
        let updated = {
            let mut sessions = self.write();
            let row = sessions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(CoreError::NotFound {
                    entity: "session",
                    id,
                })?;

            let mut merged = row.clone();
            merged.apply(patch);
            validate_goal_minutes(merged.goal_minutes)?;
            validate_interval(merged.start_time, merged.end_time)?;
            merged.updated_at = Utc::now();
            *row = merged.clone();
            merged
        };
        self.persist().await?;
        Ok(updated)
    }

    /// Remove and return a session
    pub async fn delete(&self, id: RecordId) -> CoreResult<StudySession> {
        let removed = {
            let mut sessions = self.write();
            let index = sessions
                .iter()
                .position(|s| s.id == id)
                .ok_or(CoreError::NotFound {
                    entity: "session",
                    id,
                })?;
            sessions.remove(index)
        };
        self.persist().await?;
        Ok(removed)
    }

    /// Aggregate statistics; all rates are 0 for an empty log
    pub async fn statistics(&self) -> TimerStatistics {
        let sessions = self.read();
        let total_sessions = sessions.len();
        let completed_sessions = sessions.iter().filter(|s| s.completed).count();
        let total_duration: u64 = sessions.iter().map(|s| s.duration).sum();
        let average_session = if total_sessions > 0 {
            total_duration as f64 / total_sessions as f64
        } else {
            0.0
        };

        let week_ago = Utc::now() - Duration::days(7);
        let week: Vec<&StudySession> = sessions
            .iter()
            .filter(|s| s.start_time >= week_ago)
            .collect();
        let week_duration: u64 = week.iter().map(|s| s.duration).sum();

        let completion_rate = if total_sessions > 0 {
            completed_sessions as f64 / total_sessions as f64 * 100.0
        } else {
            0.0
        };

        TimerStatistics {
            total_sessions,
            completed_sessions,
            total_duration,
            average_session,
            week_sessions: week.len(),
            week_duration,
            completion_rate,
        }
    }

    async fn next_id(&self) -> StorageResult<RecordId> {
        let current: RecordId = self
            .kv
            .get_json(keys::TIMER_ID_COUNTER)
            .await?
            .unwrap_or(0);
        let next = current + 1;
        self.kv.set_json(keys::TIMER_ID_COUNTER, &next).await?;
        Ok(next)
    }

    async fn persist(&self) -> StorageResult<()> {
        let snapshot = self.read().clone();
        self.kv.set_json(keys::TIMER_SESSIONS, &snapshot).await
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<StudySession>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<StudySession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_goal_minutes(goal_minutes: u32) -> CoreResult<()> {
    if goal_minutes == 0 {
        return Err(CoreError::validation(
            "goalMinutes",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<()> {
    if end < start {
        return Err(CoreError::validation(
            "endTime",
            "must not precede startTime",
        ));
    }
    Ok(())
}
