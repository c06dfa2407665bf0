use std::collections::VecDeque;

use thiserror::Error;
use tokio::sync::mpsc::Sender;

use crate::drivers::apple_spi::hid_report::ReportError;

use super::transport::TransportError;

/// Identifier of a host read request
pub type RequestId = u64;

/// Completion status of a host read request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("device not ready")]
    DeviceNotReady,
    #[error("device data error: {0}")]
    DataError(#[from] ReportError),
    #[error("hardware read failed: {0}")]
    HardwareFailure(#[from] TransportError),
    #[error("output buffer too small: {capacity} < {required}")]
    BufferTooSmall { capacity: usize, required: usize },
    #[error("request canceled")]
    Canceled,
    #[error("device no longer exists")]
    DeviceRemoved,
}

/// Result delivered to the host: the packed report bytes on success
pub type ReadResult = Result<Vec<u8>, ReadError>;

/// A read issued by the host that is waiting for a report
#[derive(Debug)]
pub struct HostRequest {
    id: RequestId,
    capacity: usize,
    reply: Sender<ReadResult>,
}

impl HostRequest {
    pub fn new(id: RequestId, capacity: usize, reply: Sender<ReadResult>) -> Self {
        Self {
            id,
            capacity,
            reply,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Size of the host's output buffer in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Complete the request. The host may have stopped waiting, in which case
    /// the result is discarded.
    pub fn complete(self, result: ReadResult) {
        match &result {
            Ok(data) => log::trace!("Completing request {} with {} bytes", self.id, data.len()),
            Err(e) => log::debug!("Completing request {} with error: {e}", self.id),
        }
        if let Err(e) = self.reply.try_send(result) {
            log::debug!("Host abandoned request {}: {e}", self.id);
        }
    }
}

/// FIFO of host requests waiting for a hardware completion
#[derive(Debug, Default)]
pub struct PendingQueue {
    requests: VecDeque<HostRequest>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: HostRequest) {
        self.requests.push_back(request);
    }

    /// Take the oldest pending request
    pub fn pop(&mut self) -> Option<HostRequest> {
        self.requests.pop_front()
    }

    /// Remove the request with the given id, keeping the order of the rest
    pub fn remove(&mut self, id: RequestId) -> Option<HostRequest> {
        let index = self.requests.iter().position(|r| r.id == id)?;
        self.requests.remove(index)
    }

    /// Complete every pending request with the given error, oldest first
    pub fn fail_all(&mut self, error: ReadError) {
        for request in self.requests.drain(..) {
            request.complete(Err(error.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
