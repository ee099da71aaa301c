#![forbid(unsafe_code)]

pub mod accrual;
pub mod error;
pub mod milestone;
pub mod model;
pub mod progress;
pub mod time;

pub use error::Error;
pub use time::Clock;
