pub mod error;
pub mod protocol;
pub mod quic;
pub mod share;

pub use error::FleetError;
pub use protocol::FleetMessage;
pub use share::*;
