//! TSIP GPSDO: Trimble Standard Interface Protocol driver core
//!
//! This library reconstructs TSIP messages from a receiver's serial byte
//! stream, decodes them into a receiver state model, and encodes the
//! commands that query and configure GPS-disciplined oscillators.
pub mod core;

pub mod driver;
pub mod link;
pub mod protocol;
pub mod receiver;

// Re-export commonly used items
pub use crate::core::{Diagnostic, DriverConfig, Error, LinkConfig, Result};
pub use crate::driver::{Diagnostics, Driver, Notification};
pub use crate::protocol::{Command, Report};
pub use crate::receiver::ReceiverState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
