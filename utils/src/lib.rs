//! Small shared utilities: logging setup and wall-clock helpers.

pub mod logging;
pub mod time;

pub use logging::init_tracing;
pub use time::seconds_since_epoch;
