//! Sleep timer
//!
//! One pending timer at most. Arming again cancels the previous one. When
//! it fires, the session pauses; the chapter stays loaded.

use crate::session::{SessionCore, Shared};
use crate::{PlaybackSession, SessionError, SessionResult};
use chapterline_core::{SleepTimerState, Timestamp};
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

impl PlaybackSession {
    /// Pauses playback `minutes` from now, replacing any pending timer
    pub async fn set_sleep_timer(&self, minutes: u32) -> SessionResult<()> {
        if minutes == 0 {
            return Err(SessionError::InvalidSleepTimer);
        }
        let delay = Duration::from_secs(u64::from(minutes) * 60);

        let mut core = self.shared.core.lock().await;
        core.arm_sleep_timer(delay);
        self.shared.commit(core);
        log::info!("Sleep timer set for {} minutes", minutes);
        Ok(())
    }

    /// Disarms the timer without touching playback
    pub async fn cancel_sleep_timer(&self) {
        let mut core = self.shared.core.lock().await;
        core.sleep_timer.cancel();
        core.state.sleep_timer.clear();
        self.shared.commit(core);
    }

    pub async fn sleep_timer_remaining(&self) -> Option<Duration> {
        self.shared.core.lock().await.sleep_timer.remaining()
    }
}

impl SessionCore {
    fn arm_sleep_timer(&mut self, delay: Duration) {
        self.sleep_timer.arm(self.self_ref.clone(), delay);
        self.state.sleep_timer = SleepTimerState::armed(Timestamp::now().after(delay));
    }
}

#[derive(Debug, Default)]
pub(crate) struct SleepTimer {
    task: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
    token: u64,
}

impl SleepTimer {
    /// Schedules the pause, replacing any pending one
    pub(crate) fn arm(&mut self, session: Weak<Shared>, delay: Duration) {
        self.cancel();
        self.token += 1;
        let token = self.token;
        self.deadline = Some(Instant::now() + delay);

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = session.upgrade() {
                shared.fire_sleep_timer(token).await;
            }
        }));
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.deadline = None;
    }

    /// Consumes a firing if `token` belongs to the pending timer
    ///
    /// Runs inside the timer task, so the handle is detached rather than
    /// aborted.
    pub(crate) fn take_fired(&mut self, token: u64) -> bool {
        if token != self.token || self.deadline.is_none() {
            return false;
        }
        self.task = None;
        self.deadline = None;
        true
    }

    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl Drop for SleepTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
