//! # TimeWheel Core
//! Shared error type, configuration, and the unique-id capability used by the scheduler.

pub mod config;
pub mod error;
pub mod id;

pub use config::{TimeWheelConfig, TimerSpec, WheelConfig};
pub use error::{Result, TimeWheelError};
pub use id::{IdGenerator, UuidGenerator};
