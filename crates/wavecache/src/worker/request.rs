use crate::{Request, Response, Result};
use tokio::sync::oneshot;

/// Messages processed by the background worker loop.
pub enum WorkRequest {
    /// Run one operation and reply with its outcome.
    Dispatch {
        request: Request,
        response: oneshot::Sender<Result<Response>>,
    },
    /// Cancel in-flight fetches, acknowledge and stop the loop.
    Shutdown { response: oneshot::Sender<()> },
}
