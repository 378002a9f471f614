use std::io;
use std::net::IpAddr;
use std::time::Duration;

/// Identifies a bound endpoint of the IP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub interface: String,
    pub address: IpAddr,
    pub protocol: u8,
    pub port: u16,
}

/// A datagram delivered by [`Session::recv`]. The payload sits in the
/// caller's buffer, `len` bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram {
    pub len: usize,
    pub source: IpAddr,
}

/// The IP datagram service a transport runs on.
///
/// Sessions are created and destroyed outside the transport. Dropping a
/// session releases it.
pub trait Session {
    /// Where this session is bound.
    fn descriptor(&self) -> &SessionDescriptor;

    /// Send `payload` as one datagram. Returns the number of payload bytes
    /// sent; `Ok(0)` means the datagram layer failed.
    fn send(&mut self, dst: IpAddr, protocol: u8, payload: &[u8]) -> io::Result<usize>;

    /// Block for at most `timeout` waiting for one datagram.
    ///
    /// An expired wait is reported as [`io::ErrorKind::TimedOut`] or
    /// [`io::ErrorKind::WouldBlock`]. A zero-length datagram or any other
    /// error means the datagram layer failed.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Datagram>;

    /// Transport checksum over `payload` bound to a pseudo-header for `dst`
    /// and `protocol`. The checksum field inside `payload` must be zero.
    /// The result is written to the wire big-endian.
    fn checksum(&self, dst: IpAddr, protocol: u8, payload: &[u8]) -> u16;
}

impl<S: Session + ?Sized> Session for &mut S {
    fn descriptor(&self) -> &SessionDescriptor {
        (**self).descriptor()
    }

    fn send(&mut self, dst: IpAddr, protocol: u8, payload: &[u8]) -> io::Result<usize> {
        (**self).send(dst, protocol, payload)
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Datagram> {
        (**self).recv(buf, timeout)
    }

    fn checksum(&self, dst: IpAddr, protocol: u8, payload: &[u8]) -> u16 {
        (**self).checksum(dst, protocol, payload)
    }
}

/// Opens new bound sessions, e.g. for a connection accepted by a listener.
pub trait SessionFactory {
    type Session: Session;

    fn open(&mut self, interface: &str, port: u16, protocol: u8) -> io::Result<Self::Session>;
}
