use tokio::sync::mpsc::Sender;

use super::{
    queue::{HostRequest, RequestId},
    transport::HardwareCompletion,
};

/// A [PtpCommand] is a message that can be sent to a [super::device::PtpDevice]
/// over a channel. Commands are processed in order by the device task.
#[derive(Debug)]
pub enum PtpCommand {
    SubmitRead(HostRequest),
    CancelRead(RequestId),
    HardwareComplete(HardwareCompletion),
    PowerDown,
    GetPendingCount(Sender<usize>),
    Stop,
}
