pub mod mpsc;

use std::{future::Future, time::Duration};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiveTimeoutError {
    #[error("timed out waiting for message")]
    Timeout,
    #[error("channel closed")]
    Closed,
}

/// Channel receivers that give up waiting for a message after a deadline
pub trait TimeoutReceiver<T> {
    fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<T, ReceiveTimeoutError>> + Send;
}
