//! Watch lifecycle: every forwarded watch ends when the caller's context is
//! done or the store's stop signal closes, whichever comes first.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use fluvio_future::task::spawn;
use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use tokio::select;
use tracing::{debug, trace};

use tenant_client::WatchStream;
use tenant_model::{CancelHandle, RequestContext, StopSignal, WatchEvent};

use crate::error::RegistryError;

#[derive(Debug, Clone)]
pub struct WatchLifecycle {
    stop: Arc<StopSignal>,
    live: Arc<AtomicUsize>,
}

impl WatchLifecycle {
    pub fn new(stop: Arc<StopSignal>) -> Self {
        Self {
            stop,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stop_signal(&self) -> &Arc<StopSignal> {
        &self.stop
    }

    /// observer tasks that have not exited yet
    pub fn live_tasks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Derive the context for the backing watch call.
    ///
    /// The returned guard cancels the derived context when dropped, which
    /// also releases the observer task.
    pub fn bind(&self, ctx: &RequestContext) -> (RequestContext, WatchGuard) {
        let (watch_ctx, cancel) = ctx.with_cancel();

        if self.stop.is_closed() {
            debug!("stop signal already closed, watch torn down at start");
            cancel.cancel();
        } else {
            self.live.fetch_add(1, Ordering::SeqCst);
            spawn(observe(
                self.stop.clone(),
                ctx.done_owned(),
                cancel.clone(),
                LiveTask(self.live.clone()),
            ));
        }

        (watch_ctx, WatchGuard(cancel))
    }
}

struct LiveTask(Arc<AtomicUsize>);

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn observe(
    stop: Arc<StopSignal>,
    caller_done: BoxFuture<'static, ()>,
    cancel: CancelHandle,
    _live: LiveTask,
) {
    select! {
        _ = stop.closed() => {
            debug!("stop signal closed, cancelling watch");
            cancel.cancel();
        }
        _ = caller_done => {
            trace!("caller context done");
        }
        _ = cancel.cancelled() => {
            trace!("watch released");
        }
    }
}

/// Cancels the derived watch context on every exit path.
#[derive(Debug)]
pub struct WatchGuard(CancelHandle);

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Event stream handed to the caller.
pub struct ForwardedWatch {
    inner: BoxStream<'static, Result<WatchEvent, RegistryError>>,
    _guard: WatchGuard,
}

impl ForwardedWatch {
    pub fn new(stream: WatchStream, watch_ctx: &RequestContext, guard: WatchGuard) -> Self {
        Self {
            inner: stream
                .map_err(RegistryError::from)
                .take_until(watch_ctx.done_owned())
                .boxed(),
            _guard: guard,
        }
    }
}

impl std::fmt::Debug for ForwardedWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardedWatch").finish_non_exhaustive()
    }
}

impl Stream for ForwardedWatch {
    type Item = Result<WatchEvent, RegistryError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
