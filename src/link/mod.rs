//! Transport collaborators
//!
//! A blocking serial port link and an async session over any byte stream.

pub mod serial;
pub mod session;

pub use self::serial::SerialLink;
pub use self::session::{Session, SessionExit};
