//! Collaborators the session reads from and reports to
//!
//! The session never caches what these return. Guest status and device
//! silence are read at the moment a decision is made.

use crate::guest::GuestLimitReason;
use crate::silence::SilentPlaybackPrompt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Tells whether the listener is browsing without an account
pub trait GuestFlagProvider: Send + Sync {
    fn is_guest(&self) -> bool;
}

/// Guest flag the composition root flips on sign-in and sign-out
#[derive(Debug, Clone, Default)]
pub struct GuestFlag(Arc<AtomicBool>);

impl GuestFlag {
    pub fn new(is_guest: bool) -> Self {
        Self(Arc::new(AtomicBool::new(is_guest)))
    }

    pub fn set(&self, is_guest: bool) {
        self.0.store(is_guest, Ordering::SeqCst);
    }
}

impl GuestFlagProvider for GuestFlag {
    fn is_guest(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reports whether the device would make no audible sound
///
/// Silent covers a muted ringer, zero system volume or an output route that
/// plays nowhere.
pub trait SilenceSensor: Send + Sync {
    fn is_silent(&self) -> bool;

    /// Change notifications, for sensors that can push them
    ///
    /// Sensors that return `None` are only sampled on status ticks.
    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        None
    }
}

/// Sensor for platforms that cannot detect silence
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAudible;

impl SilenceSensor for AlwaysAudible {
    fn is_silent(&self) -> bool {
        false
    }
}

/// Sensor fed by whoever observes the device's audio route
#[derive(Debug, Clone)]
pub struct SharedSilenceSensor {
    tx: Arc<watch::Sender<bool>>,
}

impl SharedSilenceSensor {
    pub fn new(is_silent: bool) -> Self {
        let (tx, _rx) = watch::channel(is_silent);
        Self { tx: Arc::new(tx) }
    }

    pub fn set_silent(&self, is_silent: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != is_silent;
            *current = is_silent;
            changed
        });
    }
}

impl Default for SharedSilenceSensor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SilenceSensor for SharedSilenceSensor {
    fn is_silent(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        Some(self.tx.subscribe())
    }
}

/// Something the UI should surface to the listener
#[derive(Debug)]
pub enum SessionNotice {
    GuestLimitReached(GuestLimitReason),
    SilentPlaybackDetected(SilentPlaybackPrompt),
}

/// Receives the session's user-facing signals
///
/// Called after the session has released its internal lock, so
/// implementations may call back into the session.
pub trait SessionNotifier: Send + Sync {
    fn on_guest_limit_reached(&self, reason: GuestLimitReason);

    /// Playback was paused (or not started) because the device is silent
    ///
    /// Confirming the prompt resumes playback. Dropping it leaves the
    /// session paused.
    fn on_silent_playback_detected(&self, prompt: SilentPlaybackPrompt);
}

/// Notifier that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl SessionNotifier for NoopNotifier {
    fn on_guest_limit_reached(&self, reason: GuestLimitReason) {
        log::debug!("Guest limit ({}) reached with no notifier attached", reason);
    }

    fn on_silent_playback_detected(&self, _prompt: SilentPlaybackPrompt) {
        log::debug!("Silent playback detected with no notifier attached");
    }
}

/// Forwards every notice into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<SessionNotice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, notice: SessionNotice) {
        if self.tx.send(notice).is_err() {
            log::debug!("Notice receiver dropped");
        }
    }
}

impl SessionNotifier for ChannelNotifier {
    fn on_guest_limit_reached(&self, reason: GuestLimitReason) {
        self.forward(SessionNotice::GuestLimitReached(reason));
    }

    fn on_silent_playback_detected(&self, prompt: SilentPlaybackPrompt) {
        self.forward(SessionNotice::SilentPlaybackDetected(prompt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_flag_is_shared_between_clones() {
        let flag = GuestFlag::new(true);
        let reader = flag.clone();
        assert!(reader.is_guest());

        flag.set(false);
        assert!(!reader.is_guest());
    }

    #[test]
    fn test_always_audible_has_no_stream() {
        assert!(!AlwaysAudible.is_silent());
        assert!(AlwaysAudible.subscribe().is_none());
    }

    #[tokio::test]
    async fn test_shared_sensor_notifies_on_change_only() {
        let sensor = SharedSilenceSensor::new(false);
        let mut rx = sensor.subscribe().expect("shared sensor pushes changes");

        sensor.set_silent(false);
        assert!(!rx.has_changed().unwrap());

        sensor.set_silent(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(sensor.is_silent());
    }

    #[test]
    fn test_channel_notifier_forwards() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.on_guest_limit_reached(GuestLimitReason::Chapter);

        assert!(matches!(
            rx.try_recv(),
            Ok(SessionNotice::GuestLimitReached(GuestLimitReason::Chapter))
        ));
    }
}
