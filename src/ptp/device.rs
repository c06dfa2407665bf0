use std::{
    error::Error,
    sync::{atomic::AtomicU64, Arc},
};

use packed_struct::PackedStruct;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    config::TrackpadConfig,
    drivers::apple_spi::{
        driver::ReportSynthesizer,
        hid_report::{ReportError, PTP_REPORT_SIZE},
        session::SessionState,
    },
};

use super::{
    client::PtpDeviceClient,
    clock::Clock,
    command::PtpCommand,
    pool::{BufferPool, PoolError},
    power::{Admission, PowerManager},
    queue::{HostRequest, PendingQueue, ReadError, ReadResult, RequestId},
    transport::{
        CompletionSink, HardwareCompletion, HardwareRead, ReadId, Transport, TransportError,
    },
};

/// Reasons a hardware read could not be started
#[derive(Error, Debug)]
pub enum IssueError {
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] PoolError),
    #[error("transport rejected read: {0}")]
    TransportRejected(#[from] TransportError),
}

/// Bridges host reads for Precision Touchpad reports to hardware reads of the
/// SPI trackpad. Host reads are queued in FIFO order and each hardware
/// completion satisfies the oldest one.
///
/// All commands, including hardware completions, are processed by the task
/// running [PtpDevice::run], so session state is only ever touched by one
/// completion at a time.
pub struct PtpDevice {
    name: String,
    tx: mpsc::Sender<PtpCommand>,
    rx: mpsc::Receiver<PtpCommand>,
    request_ids: Arc<AtomicU64>,
    transport: Box<dyn Transport>,
    power: Box<dyn PowerManager>,
    clock: Box<dyn Clock>,
    pool: BufferPool,
    synthesizer: ReportSynthesizer,
    session: SessionState,
    pending: PendingQueue,
    next_read_id: ReadId,
}

impl PtpDevice {
    pub fn new(
        config: &TrackpadConfig,
        transport: Box<dyn Transport>,
        power: Box<dyn PowerManager>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.command_queue_size.max(1));
        let session = SessionState::new(clock.now_ticks());
        Self {
            name: config.name.clone(),
            tx,
            rx,
            request_ids: Arc::new(AtomicU64::new(0)),
            transport,
            power,
            clock,
            pool: BufferPool::new(config.buffer_pool_size, config.packet_buffer_size),
            synthesizer: ReportSynthesizer::new(config.dimensions, config.ticks_per_unit),
            session,
            pending: PendingQueue::new(),
            next_read_id: 0,
        }
    }

    /// Returns a client channel that can be used to send commands to this device
    pub fn client(&self) -> PtpDeviceClient {
        PtpDeviceClient::new(self.tx.clone(), self.request_ids.clone())
    }

    /// Returns a handle to the pool read buffers are drawn from
    pub fn pool(&self) -> BufferPool {
        self.pool.clone()
    }

    /// Process commands until the device is stopped
    pub async fn run(mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        log::debug!("Started listening for commands on {}", self.name);
        while let Some(command) = self.rx.recv().await {
            match command {
                PtpCommand::SubmitRead(request) => self.submit_host_read(request),
                PtpCommand::CancelRead(id) => self.cancel_host_read(id),
                PtpCommand::HardwareComplete(completion) => self.on_hardware_complete(completion),
                PtpCommand::PowerDown => {
                    log::debug!("Device powered down, failing {} requests", self.pending.len());
                    self.pending.fail_all(ReadError::DeviceNotReady);
                }
                PtpCommand::GetPendingCount(tx) => {
                    if let Err(e) = tx.send(self.pending.len()).await {
                        log::error!("Failed to send pending request count: {e:?}");
                    }
                }
                PtpCommand::Stop => break,
            }
        }
        log::debug!("Stopped listening for commands on {}", self.name);

        self.pending.fail_all(ReadError::DeviceNotReady);
        Ok(())
    }

    /// Queue a host read and start a hardware read to satisfy it
    fn submit_host_read(&mut self, request: HostRequest) {
        let state = self.power.current_state();
        let admission = state.admission();
        if admission == Admission::Reject {
            log::warn!(
                "Unexpected read request {} while device is in {state:?}",
                request.id()
            );
            request.complete(Err(ReadError::DeviceNotReady));
            return;
        }

        log::trace!("Queueing host read request {}", request.id());
        self.pending.push(request);

        // Late init for the sleep workaround
        if admission == Admission::ReconfigureThenAdmit {
            log::info!("Re-initializing {} after resume", self.name);
            if let Err(e) = self.power.reconfigure() {
                log::error!("Failed to re-initialize {}: {e}. Ignored anyway.", self.name);
            }
        }

        if let Err(e) = self.issue_hardware_read() {
            log::warn!("Abandoned hardware read: {e}");
        }
    }

    /// Start a hardware read. This never consumes a host request; requests
    /// are only dequeued when a read completes.
    fn issue_hardware_read(&mut self) -> Result<ReadId, IssueError> {
        let buffer = self.pool.acquire()?;
        let id = self.next_read_id;
        self.next_read_id = self.next_read_id.wrapping_add(1);

        let read = HardwareRead { id, buffer };
        let sink = CompletionSink::new(self.tx.clone());
        self.transport.issue_read(read, sink)?;
        log::trace!("Issued hardware read {id}");

        Ok(id)
    }

    /// Complete the oldest host request with the report built from the given
    /// hardware read. The read and its buffer are released on every path.
    fn on_hardware_complete(&mut self, completion: HardwareCompletion) {
        let HardwareCompletion {
            read,
            length,
            status,
        } = completion;

        let Some(request) = self.pending.pop() else {
            log::debug!("No pending host request for hardware read {}, dropping it", read.id);
            return;
        };

        let result = match status {
            Ok(()) => self.build_report(&read.buffer, length, request.capacity()),
            Err(e) => {
                log::error!("Hardware read {} failed: {e}", read.id);
                Err(ReadError::HardwareFailure(e))
            }
        };
        request.complete(result);
    }

    /// Synthesize a report from the packet and pack it for the host's buffer
    fn build_report(&mut self, buf: &[u8], length: usize, capacity: usize) -> ReadResult {
        let now = self.clock.now_ticks();
        let report = self
            .synthesizer
            .synthesize(buf, length, now, &mut self.session)?;

        let data = report.pack().map_err(ReportError::from)?;
        if capacity < PTP_REPORT_SIZE {
            log::error!("Host buffer too small for report: {capacity} < {PTP_REPORT_SIZE}");
            return Err(ReadError::BufferTooSmall {
                capacity,
                required: PTP_REPORT_SIZE,
            });
        }

        Ok(data.to_vec())
    }

    /// Remove a queued host request and complete it as canceled
    fn cancel_host_read(&mut self, id: RequestId) {
        match self.pending.remove(id) {
            Some(request) => request.complete(Err(ReadError::Canceled)),
            None => log::debug!("Host read request {id} is no longer queued"),
        }
    }
}
