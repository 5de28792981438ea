//! Study timer engine
//!
//! State machine for one active study session:
//! `Idle → Running → {Paused ⇄ Running} → Idle`.
//!
//! While `Running`, a spawned one-second tick task advances the elapsed
//! counter. The task is cancelled on every transition out of `Running`,
//! so a paused or stopped timer accumulates nothing. When elapsed first
//! reaches the goal (edge-triggered, robust against skipped ticks) the
//! engine finalizes a completed session into the [`SessionLog`] on its
//! own, exactly once per started session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error};

use crate::error::{CoreError, CoreResult};
use crate::models::{GoalType, StudySession};
use crate::sessions::{NewSession, SessionLog};

/// The goal an active session is run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGoal {
    pub minutes: u32,
    pub goal_type: GoalType,
}

impl SessionGoal {
    /// 25-minute pomodoro
    pub fn pomodoro() -> Self {
        Self {
            minutes: 25,
            goal_type: GoalType::Pomodoro,
        }
    }

    /// 15-minute short session
    pub fn short() -> Self {
        Self {
            minutes: 15,
            goal_type: GoalType::Short,
        }
    }

    /// 45-minute long session
    pub fn long() -> Self {
        Self {
            minutes: 45,
            goal_type: GoalType::Long,
        }
    }

    /// User-chosen goal length
    pub fn custom(minutes: u32) -> Self {
        Self {
            minutes,
            goal_type: GoalType::Custom,
        }
    }

    fn seconds(&self) -> u64 {
        u64::from(self.minutes) * 60
    }
}

/// Externally visible timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

enum Phase {
    Idle,
    Running {
        goal: SessionGoal,
        started_at: DateTime<Utc>,
        elapsed: u64,
    },
    Paused {
        goal: SessionGoal,
        started_at: DateTime<Utc>,
        elapsed: u64,
    },
}

impl Phase {
    fn state(&self) -> TimerState {
        match self {
            Phase::Idle => TimerState::Idle,
            Phase::Running { .. } => TimerState::Running,
            Phase::Paused { .. } => TimerState::Paused,
        }
    }
}

/// The study timer
///
/// Requires a tokio runtime; `start` and `resume` spawn the tick task
/// onto it.
pub struct TimerEngine {
    log: Arc<SessionLog>,
    phase: Arc<Mutex<Phase>>,
    tick: Mutex<Option<JoinHandle<()>>>,
}

impl TimerEngine {
    pub fn new(log: Arc<SessionLog>) -> Self {
        Self {
            log,
            phase: Arc::new(Mutex::new(Phase::Idle)),
            tick: Mutex::new(None),
        }
    }

    /// Current state
    pub fn state(&self) -> TimerState {
        self.lock_phase().state()
    }

    /// Elapsed whole seconds of the active session; 0 when idle
    pub fn elapsed(&self) -> u64 {
        match *self.lock_phase() {
            Phase::Idle => 0,
            Phase::Running { elapsed, .. } | Phase::Paused { elapsed, .. } => elapsed,
        }
    }

    /// Begin a session; valid only from `Idle`
    pub async fn start(&self, goal: SessionGoal) -> CoreResult<()> {
        if goal.minutes == 0 {
            return Err(CoreError::validation("goalMinutes", "must be at least 1"));
        }
        {
            let mut phase = self.lock_phase();
            if !matches!(*phase, Phase::Idle) {
                return Err(CoreError::InvalidTransition {
                    state: phase.state().as_str(),
                    action: "start",
                });
            }
            *phase = Phase::Running {
                goal,
                started_at: Utc::now(),
                elapsed: 0,
            };
        }
        self.spawn_tick();
        debug!(goal_minutes = goal.minutes, "timer started");
        Ok(())
    }

    /// Freeze the elapsed counter; valid only from `Running`
    pub async fn pause(&self) -> CoreResult<()> {
        {
            let mut phase = self.lock_phase();
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Running {
                    goal,
                    started_at,
                    elapsed,
                } => {
                    *phase = Phase::Paused {
                        goal,
                        started_at,
                        elapsed,
                    };
                }
                other => {
                    let state = other.state().as_str();
                    *phase = other;
                    return Err(CoreError::InvalidTransition {
                        state,
                        action: "pause",
                    });
                }
            }
        }
        self.cancel_tick();
        debug!("timer paused");
        Ok(())
    }

    /// Resume counting from the frozen value; valid only from `Paused`
    pub async fn resume(&self) -> CoreResult<()> {
        {
            let mut phase = self.lock_phase();
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Paused {
                    goal,
                    started_at,
                    elapsed,
                } => {
                    *phase = Phase::Running {
                        goal,
                        started_at,
                        elapsed,
                    };
                }
                other => {
                    let state = other.state().as_str();
                    *phase = other;
                    return Err(CoreError::InvalidTransition {
                        state,
                        action: "resume",
                    });
                }
            }
        }
        self.spawn_tick();
        debug!("timer resumed");
        Ok(())
    }

    /// Finalize the session; valid from `Running` or `Paused`
    ///
    /// Returns the recorded session, or `None` when nothing had elapsed
    /// yet (no record is created for a zero-length session).
    pub async fn stop(&self) -> CoreResult<Option<StudySession>> {
        let (goal, started_at, elapsed) = {
            let mut phase = self.lock_phase();
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Running {
                    goal,
                    started_at,
                    elapsed,
                }
                | Phase::Paused {
                    goal,
                    started_at,
                    elapsed,
                } => (goal, started_at, elapsed),
                Phase::Idle => {
                    return Err(CoreError::InvalidTransition {
                        state: "idle",
                        action: "stop",
                    });
                }
            }
        };
        self.cancel_tick();

        if elapsed == 0 {
            debug!("timer stopped with nothing elapsed, no session recorded");
            return Ok(None);
        }

        let session = self
            .log
            .create(NewSession {
                duration: elapsed,
                goal_minutes: goal.minutes,
                goal_type: goal.goal_type,
                completed: elapsed >= goal.seconds(),
                start_time: started_at,
                end_time: Utc::now(),
            })
            .await?;
        debug!(id = session.id, duration = elapsed, "timer stopped");
        Ok(Some(session))
    }

    /// Discard the active session without recording it; valid from any
    /// state
    pub async fn reset(&self) {
        *self.lock_phase() = Phase::Idle;
        self.cancel_tick();
        debug!("timer reset");
    }

    fn spawn_tick(&self) {
        // Fixing the first deadline here (not inside the task) keeps
        // tick timing independent of when the task is first polled.
        let mut ticks = interval_at(Instant::now() + Duration::from_secs(1), Duration::from_secs(1));
        let phase = Arc::clone(&self.phase);
        let log = Arc::clone(&self.log);

        let handle = tokio::spawn(async move {
            loop {
                ticks.tick().await;
                let finished = {
                    let mut phase = phase.lock().unwrap_or_else(PoisonError::into_inner);
                    let (goal, started_at, elapsed) = match &mut *phase {
                        Phase::Running {
                            goal,
                            started_at,
                            elapsed,
                        } => (goal, started_at, elapsed),
                        _ => break,
                    };
                    let previous = *elapsed;
                    *elapsed += 1;
                    if *elapsed >= goal.seconds() && previous < goal.seconds() {
                        let new = NewSession {
                            duration: *elapsed,
                            goal_minutes: goal.minutes,
                            goal_type: goal.goal_type,
                            completed: true,
                            start_time: *started_at,
                            end_time: Utc::now(),
                        };
                        *phase = Phase::Idle;
                        Some(new)
                    } else {
                        None
                    }
                };

                if let Some(new) = finished {
                    debug!(duration = new.duration, "goal reached, finalizing session");
                    if let Err(err) = log.create(new).await {
                        error!(%err, "failed to record completed session");
                    }
                    break;
                }
            }
        });

        let mut slot = self.tick.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handle);
    }

    fn cancel_tick(&self) {
        let handle = self
            .tick
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.cancel_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryKv};

    async fn engine() -> (Arc<SessionLog>, TimerEngine) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        let log = Arc::new(SessionLog::load(kv).await.unwrap());
        let timer = TimerEngine::new(Arc::clone(&log));
        (log, timer)
    }

    /// Let the tick task drain pending work after the clock moved
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(secs: u64) {
        tokio::time::advance(Duration::from_secs(secs)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_advances_only_while_running() {
        let (_log, timer) = engine().await;
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed(), 0);

        timer.start(SessionGoal::pomodoro()).await.unwrap();
        advance(5).await;
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.elapsed(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_and_resume_preserves_elapsed_exactly() {
        let (_log, timer) = engine().await;
        timer.start(SessionGoal::pomodoro()).await.unwrap();
        advance(10).await;

        timer.pause().await.unwrap();
        assert_eq!(timer.state(), TimerState::Paused);

        // Paused time accumulates nothing
        advance(50).await;
        assert_eq!(timer.elapsed(), 10);

        timer.resume().await.unwrap();
        advance(5).await;
        assert_eq!(timer.elapsed(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transitions_are_rejected() {
        let (_log, timer) = engine().await;

        assert!(matches!(
            timer.pause().await.unwrap_err(),
            CoreError::InvalidTransition { action: "pause", .. }
        ));
        assert!(matches!(
            timer.resume().await.unwrap_err(),
            CoreError::InvalidTransition { action: "resume", .. }
        ));
        assert!(matches!(
            timer.stop().await.unwrap_err(),
            CoreError::InvalidTransition { action: "stop", .. }
        ));

        timer.start(SessionGoal::pomodoro()).await.unwrap();
        assert!(matches!(
            timer.start(SessionGoal::short()).await.unwrap_err(),
            CoreError::InvalidTransition { action: "start", .. }
        ));
        assert!(matches!(
            timer.resume().await.unwrap_err(),
            CoreError::InvalidTransition { action: "resume", .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_goal_rejected() {
        let (_log, timer) = engine().await;
        let err = timer.start(SessionGoal::custom(0)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_goal_completion_finalizes_exactly_once() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::custom(1)).await.unwrap();

        advance(60).await;

        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed(), 0);

        let sessions = log.all().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].completed);
        assert_eq!(sessions[0].duration, 60);
        assert_eq!(sessions[0].goal_minutes, 1);

        // Climbing past the goal must not re-trigger
        advance(120).await;
        assert_eq!(log.all().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_goal_completion_survives_pause_resume() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::custom(1)).await.unwrap();

        advance(30).await;
        timer.pause().await.unwrap();
        advance(300).await;
        timer.resume().await.unwrap();
        advance(30).await;

        assert_eq!(timer.state(), TimerState::Idle);
        let sessions = log.all().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].completed);
        assert_eq!(sessions[0].duration, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_records_incomplete_session() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::pomodoro()).await.unwrap();
        advance(90).await;

        let session = timer.stop().await.unwrap().unwrap();
        assert_eq!(session.duration, 90);
        assert!(!session.completed);
        assert_eq!(session.goal_type, GoalType::Pomodoro);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed(), 0);
        assert_eq!(log.all().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_paused_records_session() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::pomodoro()).await.unwrap();
        advance(42).await;
        timer.pause().await.unwrap();

        let session = timer.stop().await.unwrap().unwrap();
        assert_eq!(session.duration, 42);
        assert_eq!(log.all().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_with_nothing_elapsed_records_nothing() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::pomodoro()).await.unwrap();

        let session = timer.stop().await.unwrap();
        assert!(session.is_none());
        assert!(log.all().await.is_empty());
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_without_recording() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::pomodoro()).await.unwrap();
        advance(30).await;

        timer.reset().await;
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed(), 0);
        assert!(log.all().await.is_empty());

        // Reset from idle is a no-op, not an error
        timer.reset().await;

        // The engine can start a fresh session afterwards
        timer.start(SessionGoal::short()).await.unwrap();
        advance(3).await;
        assert_eq!(timer.elapsed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_accumulate_after_stop() {
        let (log, timer) = engine().await;
        timer.start(SessionGoal::custom(1)).await.unwrap();
        advance(10).await;
        timer.stop().await.unwrap();

        advance(600).await;
        assert_eq!(timer.elapsed(), 0);
        assert_eq!(log.all().await.len(), 1);
    }
}
