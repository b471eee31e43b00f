//! Hardware abstraction layer for the positioning transport
//!
//! The transport itself (serial driver, register encoding) lives outside this
//! crate; everything here talks to it through the [`Transport`] trait.

pub mod transport;
pub mod decoder;
pub mod mock;
pub mod simulated;
pub mod error;

pub use transport::{Register, Request, Response, Transport};
pub use decoder::{ErrorDecoder, TableErrorDecoder};
pub use mock::MockTransport;
pub use simulated::{SimulatedTransport, SimulationConfig};
pub use error::{CommError, CommResult};
