//! Input debouncing.
//!
//! A value is emitted only once it has stayed unchanged for the settle
//! window. Every change restarts the window.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Debounces the values published on a watch channel
#[derive(Debug)]
pub struct Debouncer<T> {
    rx: watch::Receiver<T>,
    settle: Duration,
}

impl<T: Clone> Debouncer<T> {
    pub fn new(rx: watch::Receiver<T>, settle: Duration) -> Self {
        Self { rx, settle }
    }

    /// Create the input side together with its debouncer
    pub fn channel(initial: T, settle: Duration) -> (watch::Sender<T>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self::new(rx, settle))
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Wait for the next settled value
    ///
    /// The initial value is never emitted. Returns `None` once the sender is
    /// dropped; a change still inside its window at that point is discarded.
    pub async fn settled(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;

        loop {
            tokio::select! {
                changed = self.rx.changed() => changed.ok()?,
                _ = sleep(self.settle) => return Some(self.rx.borrow_and_update().clone()),
            }
        }
    }
}
