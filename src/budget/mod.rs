//! Time budget and cooperative shutdown
//!
//! - `TimeBudget`: elapsed/remaining time against a limit, with a grace window
//!   during which no new work starts, and an interruptible sleep
//! - `ShutdownFlag`: monotonic flag flipped by termination signals
//! - `listen_for_signals`: installs the SIGINT/SIGTERM listener

mod shutdown;
mod time_budget;

pub use shutdown::{listen_for_signals, ShutdownFlag};
pub use time_budget::{format_hms, TimeBudget, TimeStatus};
