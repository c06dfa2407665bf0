pub mod client;
pub mod clock;
pub mod command;
pub mod device;
pub mod pool;
pub mod power;
pub mod queue;
pub mod transport;
