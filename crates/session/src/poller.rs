//! Engine status feed
//!
//! One task per engine handle. It merges three sources into the session:
//! periodic status reads, events the engine pushes (when it can) and
//! changes reported by the silence sensor. Every signal carries the handle
//! generation it was started for, so anything arriving after the handle
//! was retired is dropped by the session.

use crate::session::Shared;
use chapterline_core::EngineEvent;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One unit of work for the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PollSignal {
    Tick,
    Engine(EngineEvent),
    SilenceChanged(bool),
}

/// Inputs for one poller task
pub(crate) struct PollerFeed {
    pub(crate) generation: u64,
    pub(crate) interval: Duration,
    pub(crate) events: Option<mpsc::UnboundedReceiver<EngineEvent>>,
    pub(crate) silence: Option<watch::Receiver<bool>>,
}

#[derive(Debug, Default)]
pub(crate) struct StatusPoller {
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub(crate) fn start(&mut self, session: Weak<Shared>, feed: PollerFeed) {
        self.stop();
        log::debug!(
            "Status poller started for generation {} every {:?}",
            feed.generation,
            feed.interval
        );
        self.task = Some(tokio::spawn(run(session, feed)));
    }

    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(session: Weak<Shared>, mut feed: PollerFeed) {
    let mut ticker = tokio::time::interval(feed.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the handle was just loaded.
    ticker.tick().await;

    loop {
        let signal = tokio::select! {
            _ = ticker.tick() => Some(PollSignal::Tick),
            event = next_event(&mut feed.events) => event.map(PollSignal::Engine),
            silent = next_silence(&mut feed.silence) => silent.map(PollSignal::SilenceChanged),
        };

        // A closed stream yields None; fall back to ticks for that source.
        let Some(signal) = signal else {
            continue;
        };

        let Some(shared) = session.upgrade() else {
            break;
        };
        if !shared.on_poll_signal(feed.generation, signal).await {
            break;
        }
    }

    log::debug!("Status poller for generation {} exited", feed.generation);
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<EngineEvent>>) -> Option<EngineEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };
    let event = rx.recv().await;
    if event.is_none() {
        *events = None;
    }
    event
}

async fn next_silence(silence: &mut Option<watch::Receiver<bool>>) -> Option<bool> {
    let Some(rx) = silence.as_mut() else {
        return std::future::pending().await;
    };
    match rx.changed().await {
        Ok(()) => Some(*rx.borrow_and_update()),
        Err(_) => {
            *silence = None;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_event_stream_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<EngineEvent>();
        let mut events = Some(rx);

        tx.send(EngineEvent::Finished).unwrap();
        drop(tx);

        assert_eq!(next_event(&mut events).await, Some(EngineEvent::Finished));
        assert_eq!(next_event(&mut events).await, None);
        assert!(events.is_none());
    }

    #[tokio::test]
    async fn test_silence_changes_are_forwarded() {
        let (tx, rx) = watch::channel(false);
        let mut silence = Some(rx);

        tx.send_replace(true);
        assert_eq!(next_silence(&mut silence).await, Some(true));

        drop(tx);
        assert_eq!(next_silence(&mut silence).await, None);
        assert!(silence.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_exits_without_session() {
        let mut poller = StatusPoller::default();
        poller.start(
            Weak::new(),
            PollerFeed {
                generation: 1,
                interval: Duration::from_millis(500),
                events: None,
                silence: None,
            },
        );
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_stop_aborts_task() {
        let mut poller = StatusPoller::default();
        poller.start(
            Weak::new(),
            PollerFeed {
                generation: 1,
                interval: Duration::from_secs(60),
                events: None,
                silence: None,
            },
        );
        poller.stop();
        assert!(!poller.is_running());
    }
}
