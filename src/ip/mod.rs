pub mod checksum;
pub mod loopback;
pub mod session;

pub use session::{Datagram, Session, SessionDescriptor, SessionFactory};

pub const IP_HEADER_LEN: usize = 40;
pub const IP_PACKET_MAX_LEN: usize = 1280;
pub const IP_DATA_MAX_LEN: usize = IP_PACKET_MAX_LEN - IP_HEADER_LEN;

// Upper layer protocol numbers
pub const IP_PROTOCOL_TCP: u8 = 0x06;
pub const IP_PROTOCOL_UDP: u8 = 0x11;
pub const IP_PROTOCOL_ICMP: u8 = 0x3a;
