// ── Event subscription stream ──
//
// Subscription handle for notification consumers. Each commit that
// emits events publishes the batch on a watch channel; subscribers see
// the latest batch or await the next one.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::PresenceEvent;

/// A subscription to emitted event batches.
///
/// Provides both point-in-time access and reactive change notification
/// via [`changed`](Self::changed) or by converting to a `Stream`.
pub struct EventStream {
    receiver: watch::Receiver<Arc<Vec<PresenceEvent>>>,
}

impl EventStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<PresenceEvent>>>) -> Self {
        Self { receiver }
    }

    /// The most recently emitted batch (empty before the first commit
    /// that produced events).
    pub fn latest(&self) -> Arc<Vec<PresenceEvent>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next emitted batch.
    /// Returns `None` when the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<PresenceEvent>>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> EventWatchStream {
        EventWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct EventWatchStream {
    inner: WatchStream<Arc<Vec<PresenceEvent>>>,
}

impl Stream for EventWatchStream {
    type Item = Arc<Vec<PresenceEvent>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
