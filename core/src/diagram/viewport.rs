// Viewport observer
//
// Single source of truth for the measured canvas size. The host registers one
// observer per diagram and reports resizes into it; listeners watch for
// changes instead of installing their own resize hooks.

use crate::diagram::layout::Viewport;
use tokio::sync::watch;
use tracing::debug;

pub struct ViewportObserver {
    sender: watch::Sender<Viewport>,
}

impl ViewportObserver {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Viewport::default());
        Self { sender }
    }

    /// Report new dimensions. Returns whether anything changed.
    pub fn resize(&self, width: f64, height: f64) -> bool {
        let next = Viewport::new(width, height);
        let changed = self.sender.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(target: "diagram", width, height, "Viewport resized");
        }
        changed
    }

    pub fn current(&self) -> Viewport {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Viewport> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ViewportObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resize_notifies_listeners_once_per_change() {
        let observer = ViewportObserver::new();
        let mut rx = observer.subscribe();
        assert!(!observer.current().is_measured());

        assert!(observer.resize(1200.0, 800.0));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Viewport::new(1200.0, 800.0));

        assert!(!observer.resize(1200.0, 800.0));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn dropping_observer_closes_listeners() {
        let observer = ViewportObserver::new();
        let mut rx = observer.subscribe();
        drop(observer);
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn listener_count_tracks_live_receivers() {
        let observer = ViewportObserver::new();
        assert_eq!(observer.listener_count(), 0);
        let first = observer.subscribe();
        let _second = observer.subscribe();
        assert_eq!(observer.listener_count(), 2);
        drop(first);
        assert_eq!(observer.listener_count(), 1);
    }
}
