//! Event fan-out between the session and its observers
//!
//! The session publishes from the render thread and subscribers consume from
//! wherever they live, so delivery must never block the publisher. Each
//! subscription gets its own unbounded channel; a dropped subscription is
//! pruned on the next publish.

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Rumble request emitted by the core for one controller port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RumbleEvent {
    /// Core-side controller port.
    pub port: u8,
    /// Weak motor strength, in [0, 1].
    pub strength_weak: f32,
    /// Strong motor strength, in [0, 1].
    pub strength_strong: f32,
}

struct TopicState<T> {
    subscribers: Vec<Sender<T>>,
    latest: Option<T>,
}

/// A broadcast channel for one event type.
///
/// Replaying topics hand the most recent event to new subscribers right away,
/// which is what state-like streams need when an observer attaches after the
/// fact. Transient topics only deliver events published after subscription.
pub struct Topic<T> {
    state: Arc<Mutex<TopicState<T>>>,
    replay: bool,
}

impl<T: Clone> Topic<T> {
    /// Create a topic that replays the latest event to new subscribers.
    pub fn replaying() -> Self {
        Self::new(true)
    }

    /// Create a topic without replay.
    pub fn transient() -> Self {
        Self::new(false)
    }

    fn new(replay: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(TopicState {
                subscribers: Vec::new(),
                latest: None,
            })),
            replay,
        }
    }

    /// Publish an event to every live subscriber. Never blocks; subscribers
    /// whose receiving end is gone are dropped here.
    pub fn publish(&self, event: T) {
        let mut state = self.state.lock();
        if self.replay {
            state.latest = Some(event.clone());
        }
        let before = state.subscribers.len();
        state
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        let pruned = before - state.subscribers.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} disconnected subscriber(s)", pruned);
        }
    }

    /// Open a new subscription.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let mut state = self.state.lock();
        if self.replay {
            if let Some(latest) = state.latest.clone() {
                let _ = tx.send(latest);
            }
        }
        state.subscribers.push(tx);
        Subscription { receiver: rx }
    }

    /// Number of registered subscribers, counting ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            replay: self.replay,
        }
    }
}

/// The receiving end of a [`Topic`].
pub struct Subscription<T> {
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Take the next event if one is already queued.
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Take every event queued so far, in publish order.
    pub fn drain(&self) -> Vec<T> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Number of events waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// The four outward event streams a session exposes.
///
/// Frame, surface and error streams are state-like and replay their latest
/// value to late subscribers. Rumble is live haptic feedback; nothing is
/// kept for subscribers who weren't listening.
pub struct EventHub {
    frames: Topic<u64>,
    surfaces: Topic<()>,
    errors: Topic<i32>,
    rumble: Topic<RumbleEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            frames: Topic::replaying(),
            surfaces: Topic::replaying(),
            errors: Topic::replaying(),
            rumble: Topic::transient(),
        }
    }

    /// Frame-rendered notifications carrying the frame number.
    pub fn frames(&self) -> Topic<u64> {
        self.frames.clone()
    }

    /// Surface-created notifications.
    pub fn surfaces(&self) -> Topic<()> {
        self.surfaces.clone()
    }

    /// Fatal core faults as their numeric error codes.
    pub fn errors(&self) -> Topic<i32> {
        self.errors.clone()
    }

    /// Rumble requests from the core.
    pub fn rumble(&self) -> Topic<RumbleEvent> {
        self.rumble.clone()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventHub {
    fn clone(&self) -> Self {
        Self {
            frames: self.frames.clone(),
            surfaces: self.surfaces.clone(),
            errors: self.errors.clone(),
            rumble: self.rumble.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaying_topic_delivers_latest_to_late_subscriber() {
        let topic: Topic<u64> = Topic::replaying();
        topic.publish(1);
        topic.publish(2);

        let sub = topic.subscribe();
        assert_eq!(sub.try_next(), Some(2));
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn test_transient_topic_skips_late_subscriber() {
        let topic: Topic<i32> = Topic::transient();
        topic.publish(1);

        let sub = topic.subscribe();
        assert_eq!(sub.try_next(), None);

        topic.publish(2);
        assert_eq!(sub.try_next(), Some(2));
    }

    #[test]
    fn test_transient_topic_drops_without_subscribers() {
        let topic: Topic<RumbleEvent> = Topic::transient();
        topic.publish(RumbleEvent {
            port: 0,
            strength_weak: 0.5,
            strength_strong: 1.0,
        });

        // Nothing buffered for whoever shows up later.
        let sub = topic.subscribe();
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn test_every_subscriber_receives_each_event() {
        let topic: Topic<i32> = Topic::transient();
        let first = topic.subscribe();
        let second = topic.subscribe();

        topic.publish(7);
        assert_eq!(first.try_next(), Some(7));
        assert_eq!(second.try_next(), Some(7));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned_on_publish() {
        let topic: Topic<i32> = Topic::transient();
        let kept = topic.subscribe();
        let dropped = topic.subscribe();
        assert_eq!(topic.subscriber_count(), 2);

        drop(dropped);
        topic.publish(3);
        assert_eq!(topic.subscriber_count(), 1);
        assert_eq!(kept.try_next(), Some(3));
    }

    #[test]
    fn test_drain_preserves_publish_order() {
        let topic: Topic<i32> = Topic::transient();
        let sub = topic.subscribe();
        for n in 0..4 {
            topic.publish(n);
        }
        assert_eq!(sub.drain(), vec![0, 1, 2, 3]);
        assert_eq!(sub.pending(), 0);
    }

    #[test]
    fn test_hub_streams_are_shared_across_clones() {
        let hub = EventHub::new();
        let observer = hub.clone();

        let frames = observer.frames().subscribe();
        let errors = observer.errors().subscribe();
        hub.frames().publish(41);
        hub.errors().publish(-1);
        assert_eq!(frames.try_next(), Some(41));
        assert_eq!(errors.try_next(), Some(-1));
    }
}
