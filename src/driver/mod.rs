//! Periodic dispatch of reconciliation cycles.

mod cycle_driver;

pub use cycle_driver::{CycleDriver, DriverCreationError, DriverError, DriverSummary};
