//! The authoritative connection state holder.

use huddle_common::ConnectionState;
use tokio::sync::watch;

/// Single source of truth for the connection state.
///
/// Reads are synchronous and always return the latest write, so async
/// continuations call [`StateCell::get`] right before acting instead of
/// relying on a value captured before an await. Observers get change
/// notifications through [`StateCell::subscribe`].
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Store `next`. Returns the previous state if it actually changed.
    pub fn set(&self, next: ConnectionState) -> Option<ConnectionState> {
        let mut previous = None;
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            previous = Some(*current);
            *current = next;
            true
        });
        previous
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
