//! Single-consumer queue of download requests.
//!
//! The HTTP intake holds any number of [`RequestSender`] clones; the worker
//! owns the only [`RequestReceiver`]. Pushing never blocks. Dropping every
//! sender closes the queue, which the worker treats as its signal to stop.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tf_core::{DownloadRequest, Error};

/// Create a connected sender/receiver pair.
pub fn request_queue() -> (RequestSender, RequestReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RequestSender { tx }, RequestReceiver { rx })
}

/// Producer half; cheap to clone.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: mpsc::UnboundedSender<DownloadRequest>,
}

impl RequestSender {
    /// Enqueue a request without waiting for the worker.
    ///
    /// Fails only when the receiving worker is gone.
    pub fn push(&self, request: DownloadRequest) -> tf_core::Result<()> {
        self.tx
            .send(request)
            .map_err(|e| Error::Internal(format!("download worker is not running (dropped {})", e.0.media_id)))
    }

    /// `true` once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the worker.
#[derive(Debug)]
pub struct RequestReceiver {
    rx: mpsc::UnboundedReceiver<DownloadRequest>,
}

impl RequestReceiver {
    /// Wait for the next request in FIFO order.
    ///
    /// Returns `None` when `cancel` fires or when every sender is dropped and
    /// the queue is drained.
    pub async fn pop(&mut self, cancel: &CancellationToken) -> Option<DownloadRequest> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            req = self.rx.recv() => req,
        }
    }

    /// Requests waiting right now.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
