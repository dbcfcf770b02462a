//! Playback session
//!
//! The session owns at most one engine handle and the [`PlaybackState`]
//! describing it. Every mutation runs under one async mutex: user commands,
//! status ticks, the sleep timer and chapter advance all queue on it, so an
//! engine call never sees a half-loaded or half-released handle.
//!
//! Notices for the UI are collected while the lock is held and delivered
//! after it is released.

use crate::capabilities::{
    AlwaysAudible, GuestFlag, GuestFlagProvider, NoopNotifier, SessionNotice, SessionNotifier,
    SilenceSensor,
};
use crate::guest::{GuestLimitReason, GuestPolicy, GuestPolicyGuard};
use crate::navigator::Resume;
use crate::poller::{PollSignal, PollerFeed, StatusPoller};
use crate::silence::{SilenceTrigger, SilentPlaybackGuard, SilentPlaybackPrompt};
use crate::sleep_timer::SleepTimer;
use crate::transport::{clamp_position, PlayOutcome};
use crate::{SessionError, SessionResult};
use chapterline_config::{Config, SessionConfig};
use chapterline_core::{
    Book, EngineEvent, EngineFactory, EngineHandle, EngineStatus, PlaybackState,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex, MutexGuard};

/// Configures and builds a [`PlaybackSession`]
pub struct SessionBuilder {
    factory: Arc<dyn EngineFactory>,
    guest_flag: Arc<dyn GuestFlagProvider>,
    silence_sensor: Arc<dyn SilenceSensor>,
    notifier: Arc<dyn SessionNotifier>,
    config: SessionConfig,
    guest_policy: GuestPolicy,
}

impl SessionBuilder {
    fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            guest_flag: Arc::new(GuestFlag::new(false)),
            silence_sensor: Arc::new(AlwaysAudible),
            notifier: Arc::new(NoopNotifier),
            config: SessionConfig::default(),
            guest_policy: GuestPolicy::default(),
        }
    }

    pub fn guest_flag(mut self, provider: impl GuestFlagProvider + 'static) -> Self {
        self.guest_flag = Arc::new(provider);
        self
    }

    pub fn silence_sensor(mut self, sensor: impl SilenceSensor + 'static) -> Self {
        self.silence_sensor = Arc::new(sensor);
        self
    }

    pub fn notifier(mut self, notifier: impl SessionNotifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Takes session tuning and guest limits from a loaded config
    pub fn config(mut self, config: &Config) -> Self {
        self.config = config.session.clone();
        self.guest_policy = GuestPolicy::from(&config.guest);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn guest_policy(mut self, policy: GuestPolicy) -> Self {
        self.guest_policy = policy;
        self
    }

    pub fn build(self) -> PlaybackSession {
        let mut state = PlaybackState::idle();
        state.playback_rate = self.config.default_rate;
        state.volume = self.config.default_volume;

        let (state_tx, _) = watch::channel(state.clone());
        let shared = Arc::new_cyclic(|weak| Shared {
            core: Mutex::new(SessionCore {
                state,
                engine: None,
                generation: 0,
                finished_generation: None,
                poller: StatusPoller::default(),
                sleep_timer: SleepTimer::default(),
                silence: SilentPlaybackGuard::new(),
                guest: GuestPolicyGuard::new(self.guest_policy),
                notices: Vec::new(),
                factory: self.factory,
                guest_flag: self.guest_flag,
                silence_sensor: self.silence_sensor,
                config: self.config,
                self_ref: weak.clone(),
            }),
            notifier: self.notifier,
            state_tx,
        });

        PlaybackSession { shared }
    }
}

/// Handle to one listening session
///
/// Cheap to clone; all clones drive the same engine handle. Background
/// tasks hold only weak references, so dropping the last clone stops them.
#[derive(Clone)]
pub struct PlaybackSession {
    pub(crate) shared: Arc<Shared>,
}

impl PlaybackSession {
    pub fn builder(factory: Arc<dyn EngineFactory>) -> SessionBuilder {
        SessionBuilder::new(factory)
    }

    /// Opens `chapter_index` of `book`, replacing whatever was loaded
    ///
    /// The new chapter starts paused at position zero.
    pub async fn load_book(&self, book: Arc<Book>, chapter_index: usize) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.load(book, chapter_index).await;
        self.shared.commit(core);
        result
    }

    /// Releases the engine and returns to idle
    pub async fn stop_playback(&self) {
        let mut core = self.shared.core.lock().await;
        core.stop().await;
        self.shared.commit(core);
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receives every state change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state_tx.subscribe()
    }

    pub async fn has_engine(&self) -> bool {
        self.shared.core.lock().await.engine.is_some()
    }

    /// Resumes playback the listener agreed to hear on a silent device
    pub async fn confirm_silent_playback(
        &self,
        prompt: SilentPlaybackPrompt,
    ) -> SessionResult<PlayOutcome> {
        if !prompt.belongs_to(&self.shared) {
            log::warn!("Ignoring a silent playback prompt raised by another session");
            return Ok(PlayOutcome::NoMedia);
        }
        self.shared
            .resume_after_silence_prompt(prompt.generation())
            .await
    }
}

pub(crate) struct Shared {
    pub(crate) core: Mutex<SessionCore>,
    notifier: Arc<dyn SessionNotifier>,
    state_tx: watch::Sender<PlaybackState>,
}

impl Shared {
    /// Publishes state, releases the lock, then delivers queued notices
    pub(crate) fn commit(&self, mut core: MutexGuard<'_, SessionCore>) {
        let notices = std::mem::take(&mut core.notices);
        self.state_tx.send_if_modified(|published| {
            if *published == core.state {
                return false;
            }
            *published = core.state.clone();
            true
        });
        drop(core);

        for notice in notices {
            match notice {
                SessionNotice::GuestLimitReached(reason) => {
                    self.notifier.on_guest_limit_reached(reason)
                }
                SessionNotice::SilentPlaybackDetected(prompt) => {
                    self.notifier.on_silent_playback_detected(prompt)
                }
            }
        }
    }

    /// Handles one signal from the poller
    ///
    /// Returns false when the poller belongs to a retired handle and
    /// should exit.
    pub(crate) async fn on_poll_signal(&self, generation: u64, signal: PollSignal) -> bool {
        let mut core = self.core.lock().await;
        if core.generation != generation || core.engine.is_none() {
            return false;
        }

        match signal {
            PollSignal::Tick => {
                let status = match core.engine.as_mut() {
                    Some(engine) => engine.status(),
                    None => return false,
                };
                core.on_status(generation, status).await;
            }
            PollSignal::Engine(EngineEvent::Status(status)) => {
                core.on_status(generation, status).await;
            }
            PollSignal::Engine(EngineEvent::Finished) => {
                core.state.is_playing = false;
                core.state.position = core.state.duration;
                core.begin_chapter_finish(generation);
            }
            PollSignal::SilenceChanged(is_silent) => {
                core.observe_silence(is_silent).await;
            }
        }

        self.commit(core);
        true
    }

    pub(crate) async fn handle_chapter_finished(&self, generation: u64) {
        let mut core = self.core.lock().await;
        if core.generation != generation {
            log::debug!("Skipping advance for retired generation {}", generation);
            return;
        }

        log::info!(
            "Chapter {} finished, advancing",
            core.state.current_chapter_index
        );
        if let Err(e) = core.next_chapter(Resume::Always).await {
            log::warn!("Automatic chapter advance failed: {}", e);
        }
        self.commit(core);
    }

    pub(crate) async fn fire_sleep_timer(&self, token: u64) {
        let mut core = self.core.lock().await;
        if !core.sleep_timer.take_fired(token) {
            return;
        }

        log::info!("Sleep timer fired, pausing playback");
        core.state.sleep_timer.clear();
        if let Err(e) = core.pause().await {
            log::warn!("Sleep timer could not pause playback: {}", e);
        }
        self.commit(core);
    }

    pub(crate) async fn resume_after_silence_prompt(
        &self,
        generation: u64,
    ) -> SessionResult<PlayOutcome> {
        let mut core = self.core.lock().await;
        let result = if core.generation != generation || core.engine.is_none() {
            log::debug!("Silent playback prompt outlived its chapter; ignoring");
            Ok(PlayOutcome::NoMedia)
        } else {
            log::info!("Listener confirmed playback on a silent device");
            core.play_unchecked().await.map(|()| PlayOutcome::Started)
        };
        self.commit(core);
        result
    }
}

/// Everything guarded by the session lock
pub(crate) struct SessionCore {
    pub(crate) state: PlaybackState,
    pub(crate) engine: Option<Box<dyn EngineHandle>>,
    /// Bumped whenever a handle is created or retired
    pub(crate) generation: u64,
    finished_generation: Option<u64>,
    poller: StatusPoller,
    pub(crate) sleep_timer: SleepTimer,
    pub(crate) silence: SilentPlaybackGuard,
    pub(crate) guest: GuestPolicyGuard,
    pub(crate) notices: Vec<SessionNotice>,
    factory: Arc<dyn EngineFactory>,
    pub(crate) guest_flag: Arc<dyn GuestFlagProvider>,
    pub(crate) silence_sensor: Arc<dyn SilenceSensor>,
    pub(crate) config: SessionConfig,
    pub(crate) self_ref: Weak<Shared>,
}

impl SessionCore {
    pub(crate) async fn load(&mut self, book: Arc<Book>, chapter_index: usize) -> SessionResult<()> {
        let Some(chapter) = book.chapter(chapter_index) else {
            return Err(SessionError::ChapterOutOfRange {
                index: chapter_index,
                count: book.chapter_count(),
            });
        };
        let source = chapter.source.clone();
        let nominal_duration = chapter.duration.as_secs_f64();

        self.retire().await;

        let mut handle = self.factory.create(&source).await.map_err(|e| {
            log::error!("Engine creation failed for {}: {}", source, e);
            SessionError::Load {
                book_id: book.id,
                chapter_index,
                source: e,
            }
        })?;

        if let Err(e) = handle.set_rate(self.state.playback_rate).await {
            log::warn!("New engine refused rate {}: {}", self.state.playback_rate, e);
        }
        if let Err(e) = handle.set_volume(self.state.volume).await {
            log::warn!("New engine refused volume {}: {}", self.state.volume, e);
        }
        let events = handle.subscribe();

        self.generation += 1;
        self.engine = Some(handle);
        log::info!(
            "Loaded chapter {} of \"{}\" (generation {})",
            chapter_index,
            book.title,
            self.generation
        );

        self.state.current_book = Some(book);
        self.state.current_chapter_index = chapter_index;
        self.state.is_playing = false;
        self.state.position = 0.0;
        self.state.duration = nominal_duration;

        self.poller.start(
            self.self_ref.clone(),
            PollerFeed {
                generation: self.generation,
                interval: self.config.status_poll_interval(),
                events,
                silence: self.silence_sensor.subscribe(),
            },
        );
        Ok(())
    }

    /// Stops the poller and releases the current handle, if any
    ///
    /// Book and chapter index survive; the handle reference is gone
    /// afterwards whatever the engine reports.
    pub(crate) async fn retire(&mut self) {
        let Some(mut handle) = self.engine.take() else {
            return;
        };

        self.poller.stop();
        self.generation += 1;
        let was_playing = self.state.is_playing;
        self.state.is_playing = false;
        self.state.position = 0.0;
        log::debug!("Retiring engine handle (generation {})", self.generation);

        let teardown = AssertUnwindSafe(async move {
            if was_playing {
                if let Err(e) = handle.pause().await {
                    log::warn!("Failed to pause engine during teardown: {}", e);
                }
            }
            handle.remove_all_listeners();
            if let Err(e) = handle.release().await {
                log::warn!("Failed to release engine: {}", e);
            }
        });

        if teardown.catch_unwind().await.is_err() {
            log::error!("Engine panicked during teardown; handle discarded");
        }
    }

    pub(crate) async fn stop(&mut self) {
        self.retire().await;
        self.sleep_timer.cancel();
        self.state.reset_to_idle();
        log::info!("Playback stopped");
    }

    /// Mirrors an engine status report and runs the tick-time guards
    async fn on_status(&mut self, generation: u64, status: EngineStatus) {
        self.state.is_playing = status.playing;
        if status.duration > 0.0 {
            self.state.duration = status.duration;
        }
        self.state.position = clamp_position(status.position, self.state.duration);

        if status.did_just_finish {
            // Sample silence without acting on it; the chapter is over
            self.silence.observe(false, self.silence_sensor.is_silent());
            self.begin_chapter_finish(generation);
            return;
        }

        let is_guest = self.guest_flag.is_guest();
        if let Some(reason) =
            self.guest
                .check_time(is_guest, self.state.is_playing, self.state.position)
        {
            self.pause_for_guest_limit(reason).await;
        }

        let is_silent = self.silence_sensor.is_silent();
        self.observe_silence(is_silent).await;
    }

    pub(crate) async fn observe_silence(&mut self, is_silent: bool) {
        if !self.silence.observe(self.state.is_playing, is_silent) {
            return;
        }

        log::info!("Device went silent during playback, pausing");
        if let Err(e) = self.pause().await {
            log::warn!("Could not pause silent playback: {}", e);
        }
        self.raise_silence_prompt(SilenceTrigger::WentSilent);
    }

    pub(crate) fn raise_silence_prompt(&mut self, trigger: SilenceTrigger) {
        let prompt = SilentPlaybackPrompt::new(self.self_ref.clone(), self.generation, trigger);
        self.notices.push(SessionNotice::SilentPlaybackDetected(prompt));
    }

    pub(crate) async fn pause_for_guest_limit(&mut self, reason: GuestLimitReason) {
        log::info!("Guest {} limit reached, pausing", reason);
        if let Err(e) = self.pause().await {
            log::warn!("Could not pause at guest limit: {}", e);
        }
        self.notices.push(SessionNotice::GuestLimitReached(reason));
    }

    /// Schedules the advance on its own task, once per handle
    ///
    /// The poller waits on the session lock that the advance holds while it
    /// retires the poller, so the advance cannot run on the poller's task.
    fn begin_chapter_finish(&mut self, generation: u64) {
        if self.finished_generation == Some(generation) {
            return;
        }
        self.finished_generation = Some(generation);

        let session = self.self_ref.clone();
        tokio::spawn(async move {
            if let Some(shared) = session.upgrade() {
                shared.handle_chapter_finished(generation).await;
            }
        });
    }
}

/// Detaches the engine when the last session clone goes away
///
/// `release` is async and cannot run here; callers wanting an orderly
/// release call `stop_playback` first. Listeners are always removed so the
/// handle stops pushing into a dead session.
impl Drop for SessionCore {
    fn drop(&mut self) {
        self.poller.stop();
        self.sleep_timer.cancel();

        let Some(mut handle) = self.engine.take() else {
            return;
        };
        log::debug!("Session dropped with a live engine handle; detaching listeners");
        let detached =
            std::panic::catch_unwind(AssertUnwindSafe(|| handle.remove_all_listeners()));
        if detached.is_err() {
            log::error!("Engine panicked while detaching listeners on drop");
        }
    }
}
