use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use thiserror::Error;
use tokio::sync::mpsc::{
    channel,
    error::{SendError, SendTimeoutError},
    Receiver, Sender,
};

use crate::sync::{ReceiveTimeoutError, TimeoutReceiver};

use super::{
    command::PtpCommand,
    queue::{HostRequest, ReadError, ReadResult, RequestId},
};

/// Maximum duration to wait when talking to the device task. If this timeout
/// is reached, that typically indicates a deadlock somewhere in the code.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Possible errors for a device client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to send command to device")]
    SendError(SendError<PtpCommand>),
    #[error("timed out sending command to device")]
    Timeout,
    #[error("device no longer exists")]
    ChannelClosed,
}

impl From<SendError<PtpCommand>> for ClientError {
    fn from(err: SendError<PtpCommand>) -> Self {
        Self::SendError(err)
    }
}

/// A host read that has been submitted to the device
#[derive(Debug)]
pub struct PendingRead {
    id: RequestId,
    rx: Receiver<ReadResult>,
}

impl PendingRead {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the device to complete the read. There is no deadline; a read
    /// stays queued until a hardware completion, cancellation or power down.
    pub async fn wait(mut self) -> ReadResult {
        self.rx.recv().await.unwrap_or(Err(ReadError::DeviceRemoved))
    }

    /// Wait for the device to complete the read, giving up after `timeout`.
    /// The read stays queued on the device after a timeout.
    pub async fn wait_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<ReadResult, ReceiveTimeoutError> {
        self.rx.recv_timeout(timeout).await
    }
}

/// A client for communicating with a trackpad device task
#[derive(Debug, Clone)]
pub struct PtpDeviceClient {
    tx: Sender<PtpCommand>,
    request_ids: Arc<AtomicU64>,
}

impl PtpDeviceClient {
    pub fn new(tx: Sender<PtpCommand>, request_ids: Arc<AtomicU64>) -> Self {
        Self { tx, request_ids }
    }

    /// Send the given command to the device. This method uses a timeout
    /// to detect potential deadlocks.
    async fn send(&self, cmd: PtpCommand) -> Result<(), ClientError> {
        let result = self.tx.send_timeout(cmd, DEFAULT_TIMEOUT).await;
        let Err(err) = result else {
            return Ok(());
        };
        match err {
            SendTimeoutError::Timeout(cmd) => {
                log::error!("POSSIBLE DEADLOCK: timed out after {DEFAULT_TIMEOUT:?} sending command to trackpad device: {cmd:?}");
                Err(ClientError::Timeout)
            }
            SendTimeoutError::Closed(_) => Err(ClientError::ChannelClosed),
        }
    }

    /// Use the given receiver to wait for a response from the device.
    /// This method uses a timeout to detect potential deadlocks.
    async fn recv<T>(mut rx: Receiver<T>) -> Option<T>
    where
        T: Send + Sync,
    {
        match rx.recv_timeout(DEFAULT_TIMEOUT).await {
            Ok(value) => Some(value),
            Err(ReceiveTimeoutError::Timeout) => {
                log::error!("POSSIBLE DEADLOCK: timed out after {DEFAULT_TIMEOUT:?} waiting for response from trackpad device");
                None
            }
            Err(ReceiveTimeoutError::Closed) => None,
        }
    }

    /// Submit a host read with an output buffer of `capacity` bytes. The
    /// returned [PendingRead] resolves when the device completes the read.
    pub async fn submit_read(&self, capacity: usize) -> Result<PendingRead, ClientError> {
        let id = self.request_ids.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = channel(1);
        let request = HostRequest::new(id, capacity, tx);
        self.send(PtpCommand::SubmitRead(request)).await?;
        Ok(PendingRead { id, rx })
    }

    /// Cancel a queued host read. The read completes with [ReadError::Canceled]
    /// if it was still waiting.
    pub async fn cancel_read(&self, id: RequestId) -> Result<(), ClientError> {
        self.send(PtpCommand::CancelRead(id)).await
    }

    /// Notify the device that it left the working power state. Every queued
    /// read is failed with [ReadError::DeviceNotReady].
    pub async fn power_down(&self) -> Result<(), ClientError> {
        self.send(PtpCommand::PowerDown).await
    }

    /// Returns the number of host reads waiting for a report
    pub async fn pending_count(&self) -> Result<usize, ClientError> {
        let (tx, rx) = channel(1);
        self.send(PtpCommand::GetPendingCount(tx)).await?;
        if let Some(count) = Self::recv(rx).await {
            return Ok(count);
        }
        Err(ClientError::ChannelClosed)
    }

    /// Stop the device task
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.send(PtpCommand::Stop).await
    }
}
