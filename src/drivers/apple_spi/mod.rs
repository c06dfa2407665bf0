pub mod driver;
pub mod hid_report;
pub mod session;
#[cfg(test)]
pub mod driver_test;
