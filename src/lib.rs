//! Printable-character counting over a length-prefixed TCP protocol.
//!
//! A client sends a 4-byte big-endian length `N`, then `N` payload bytes.
//! The server answers with a 4-byte big-endian count of the bytes in the
//! payload that fall in `32..=126`.

pub mod error;
pub mod frame;
pub mod logger;
pub mod tally;
pub mod transfer;

pub use error::{Error, Result};
pub use tally::Tally;
pub use transfer::{send_file, TransferTask};
