//! X11 protocol implementation
//!
//! This module implements the client side of the X11 wire protocol: the
//! connection setup, the subset of requests we send, the events we receive
//! and the error records the server may answer with. Everything is encoded
//! little-endian since we always announce `'l'` during setup.

pub mod types;
pub mod errors;
pub mod events;
pub mod requests;
pub mod setup;

pub use types::*;
pub use errors::*;
pub use events::*;
pub use requests::*;
pub use setup::*;

/// X11 protocol version
pub const PROTOCOL_MAJOR_VERSION: u16 = 11;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// Largest value the 16-bit request length field can carry, in 4-byte units
pub const MAX_REQUEST_UNITS: usize = 0xFFFF;

/// Size of every event, error and reply header on the wire
pub const EVENT_SIZE: usize = 32;

/// Padding helper - X11 requires data to be padded to 4-byte boundaries
pub fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Calculate padded length
pub fn padded_len(n: usize) -> usize {
    n + pad(n)
}
