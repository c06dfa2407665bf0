pub mod cli;
pub mod config;
pub mod drivers;
pub mod ptp;
pub mod sync;
