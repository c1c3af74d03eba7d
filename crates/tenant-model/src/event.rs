use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use event_listener::Event;
use futures_util::future::BoxFuture;
use tracing::trace;

const SIGNAL_ORDERING: Ordering = Ordering::SeqCst;

/// Close-once notification.
///
/// Once closed it stays closed: every current and future waiter on
/// [`StopSignal::closed`] resolves immediately.
#[derive(Debug, Default)]
pub struct StopSignal {
    closed: AtomicBool,
    event: Event,
}

impl StopSignal {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(SIGNAL_ORDERING)
    }

    /// close the signal, returns false if it was already closed
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, SIGNAL_ORDERING);
        if first {
            self.event.notify(usize::MAX);
        }
        first
    }

    /// wait until closed
    pub async fn closed(&self) {
        if self.is_closed() {
            trace!("already closed");
            return;
        }

        let listener = self.event.listen();

        // close may have raced with listener registration
        if self.is_closed() {
            trace!("closed while registering");
            return;
        }

        listener.await
    }

    pub fn closed_pinned(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.closed())
    }
}
