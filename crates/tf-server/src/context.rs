//! Application context shared across route handlers via Axum state.

use tf_pipeline::RequestSender;

/// State handed to every handler.
///
/// Holds the producer side of the request queue; the worker owns the
/// consumer side.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub sender: RequestSender,
}

impl AppContext {
    pub fn new(sender: RequestSender) -> Self {
        Self { sender }
    }
}
