//! Connection establishment for a minimal TCP-like transport running
//! directly on an IP datagram service.
//!
//! The IP layer is external: anything implementing [`ip::Session`] can carry
//! segments. [`tcp::Handshake`] drives the three-way handshake over a session
//! and hands back an established [`tcp::Connection`].

pub mod ip;
pub mod tcp;
