pub mod config;
pub mod conn;
pub mod errors;
pub mod flags;
pub mod handshake;
pub mod header;
pub mod segment;
pub mod state;
pub mod wrap32;

#[cfg(test)]
mod test_utils;

// -- Re-export structs for more concise usage

pub use config::TcpConfig;
pub use conn::Connection;
pub use errors::{HeaderError, TcpError};
pub use flags::TcpFlags;
pub use handshake::Handshake;
pub use header::TcpHeader;
pub use state::TcpState;
pub use wrap32::Wrap32;
