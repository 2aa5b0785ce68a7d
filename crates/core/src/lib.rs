#![forbid(unsafe_code)]

pub mod aggregation;
pub mod error;
pub mod model;
pub mod progress_machine;
pub mod status;
pub mod time;

pub use error::Error;
pub use time::Clock;
