//! Fire-and-forget queue of fact requests.
//!
//! Producers never block: `enqueue` uses `try_send` and drops the request
//! with a warning when the buffer is full. A single
//! [`FactRequestDispatcher`](crate::features::reports::workers::FactRequestDispatcher)
//! drains the receiver.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::modules::measurement::FactRequest;

/// Receiver end, handed to the dispatcher
pub type FactRequestReceiver = mpsc::Receiver<FactRequest>;

#[derive(Clone)]
pub struct FactRequestQueue {
    sender: mpsc::Sender<FactRequest>,
}

impl FactRequestQueue {
    pub fn with_capacity(capacity: usize) -> (Self, FactRequestReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Returns `false` if the request was dropped
    pub fn enqueue(&self, request: FactRequest) -> bool {
        match self.sender.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                tracing::warn!(
                    "Fact request queue full, dropping request for report {} resource {}",
                    request.report_id,
                    request.resource_id
                );
                false
            }
            Err(TrySendError::Closed(request)) => {
                tracing::warn!(
                    "Fact request dispatcher stopped, dropping request for report {} resource {}",
                    request.report_id,
                    request.resource_id
                );
                false
            }
        }
    }
}
