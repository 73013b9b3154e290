pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod notify;
pub mod pose;
pub mod zone;

pub use engine::{TickReport, ZoneEngine};
pub use error::{Error, Result};
