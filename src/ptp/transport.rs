use thiserror::Error;
use tokio::sync::mpsc::Sender;

use super::{client::ClientError, command::PtpCommand, pool::PooledBuffer};

/// Identifier of a hardware read request
pub type ReadId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport rejected read request: {0}")]
    Rejected(String),
    #[error("transport read failed: {0}")]
    Failed(String),
}

/// A read request sent to the trackpad along with the buffer the packet is
/// written into. Dropping it releases the buffer.
#[derive(Debug)]
pub struct HardwareRead {
    pub id: ReadId,
    pub buffer: PooledBuffer,
}

/// A finished hardware read. `length` is the number of bytes the transport
/// wrote into the read buffer.
#[derive(Debug)]
pub struct HardwareCompletion {
    pub read: HardwareRead,
    pub length: usize,
    pub status: Result<(), TransportError>,
}

/// Byte level transport to the trackpad
pub trait Transport: Send {
    /// Start the given read. On success the transport owns the read until it
    /// hands it back through `sink`. On failure the read is dropped, which
    /// releases its buffer.
    fn issue_read(&mut self, read: HardwareRead, sink: CompletionSink)
        -> Result<(), TransportError>;
}

/// Handle a transport uses to deliver a finished read back to the device.
/// Completions are queued on the device's command channel so they are
/// processed one at a time by the device task.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    tx: Sender<PtpCommand>,
}

impl CompletionSink {
    pub(crate) fn new(tx: Sender<PtpCommand>) -> Self {
        Self { tx }
    }

    /// Deliver the finished read from an async context
    pub async fn complete(
        &self,
        read: HardwareRead,
        length: usize,
        status: Result<(), TransportError>,
    ) -> Result<(), ClientError> {
        let completion = HardwareCompletion {
            read,
            length,
            status,
        };
        self.tx
            .send(PtpCommand::HardwareComplete(completion))
            .await?;
        Ok(())
    }

    /// Deliver the finished read from a transport thread (blocking)
    pub fn blocking_complete(
        &self,
        read: HardwareRead,
        length: usize,
        status: Result<(), TransportError>,
    ) -> Result<(), ClientError> {
        let completion = HardwareCompletion {
            read,
            length,
            status,
        };
        self.tx
            .blocking_send(PtpCommand::HardwareComplete(completion))?;
        Ok(())
    }
}
