use crate::ip::{Session, IP_DATA_MAX_LEN, IP_PROTOCOL_TCP};
use crate::tcp::config::TcpConfig;
use crate::tcp::errors::{HeaderError, TcpError};
use crate::tcp::flags::TcpFlags;
use crate::tcp::header::TcpHeader;
use crate::tcp::wrap32::Wrap32;
use log::{debug, trace, warn};
use std::io::{Error, ErrorKind};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// A builder for outgoing TCP segments. Single threaded only.
#[derive(Debug, Clone)]
pub struct TcpSegment {
    pub tcph: TcpHeader, // TCP header template
    pub payload: Vec<u8>,
}

impl TcpSegment {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        TcpSegment {
            tcph: TcpHeader::new(src_port, dst_port),
            payload: vec![],
        }
    }

    pub fn seq_no(&mut self, seq_no: Wrap32) -> &mut Self {
        self.tcph.seq_no = seq_no;
        self
    }

    pub fn ack_no(&mut self, ack_no: Wrap32) -> &mut Self {
        self.tcph.ack_no = ack_no;
        self
    }

    pub fn tcp_flags(&mut self, flags: TcpFlags) -> &mut Self {
        self.tcph.flags = flags;
        self
    }

    pub fn window_size(&mut self, window_size: u16) -> &mut Self {
        self.tcph.window = window_size;
        self
    }

    pub fn payload(&mut self, payload: &[u8]) -> &mut Self {
        self.payload = payload.to_vec();
        self
    }

    /// Encode header and payload, checksummed by `session` for `dst`.
    ///
    /// The checksum is computed with the field zeroed, then patched in.
    pub fn build<S: Session + ?Sized>(&self, session: &S, dst: IpAddr) -> Result<Vec<u8>, TcpError> {
        let mut tcph = self.tcph.clone();
        tcph.checksum = 0;

        let mut bytes = tcph.to_bytes()?;
        bytes.extend_from_slice(&self.payload);

        let checksum = session.checksum(dst, IP_PROTOCOL_TCP, &bytes);
        TcpHeader::set_checksum(&mut bytes, checksum)?;
        Ok(bytes)
    }

    /// Build the segment and hand it to the IP layer.
    pub fn send<S: Session + ?Sized>(&self, session: &mut S, dst: IpAddr) -> Result<(), TcpError> {
        let bytes = self.build(session, dst)?;
        trace!("tx {} -> {}:{}: {}", self.tcph.flags_str(), dst, self.tcph.dst_port, hex::encode(&bytes));

        match session.send(dst, IP_PROTOCOL_TCP, &bytes) {
            Ok(0) => {
                warn!("send to {} failed: datagram layer sent nothing", dst);
                Err(TcpError::SendFailure(Error::new(ErrorKind::WriteZero, "datagram layer sent zero bytes")))
            }
            Ok(_) => Ok(()),
            Err(err) => {
                warn!("send to {} failed: {}", dst, err);
                Err(TcpError::SendFailure(err))
            }
        }
    }
}

/// A checksum-verified segment as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSegment {
    pub source: IpAddr,
    pub tcph: TcpHeader,
    pub payload: Vec<u8>,
}

impl InboundSegment {
    fn decode<S: Session + ?Sized>(session: &S, source: IpAddr, bytes: &[u8]) -> Result<Self, HeaderError> {
        let tcph = TcpHeader::parse(bytes)?;

        let mut zeroed = bytes.to_vec();
        zeroed[16..18].fill(0);
        let expected = session.checksum(source, IP_PROTOCOL_TCP, &zeroed);
        if expected != tcph.checksum {
            return Err(HeaderError::BadChecksum { expected, found: tcph.checksum });
        }

        Ok(InboundSegment {
            source,
            payload: bytes[tcph.header_len()..].to_vec(),
            tcph,
        })
    }

    /// True if the segment was sent from `peer`.
    pub fn is_from(&self, peer: SocketAddr) -> bool {
        self.source == peer.ip() && self.tcph.src_port == peer.port()
    }
}

/// How long, and how many times, a caller may wait for a segment.
#[derive(Debug)]
pub struct RecvBudget {
    started: Instant,
    deadline: Instant,
    attempts: u32,
    max_attempts: u32,
}

impl RecvBudget {
    pub fn new(config: &TcpConfig) -> Self {
        let started = Instant::now();
        RecvBudget {
            started,
            deadline: started + config.timeout,
            attempts: 0,
            max_attempts: config.max_attempts,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Use up one attempt. Returns the time left, or `None` once spent.
    fn next_attempt(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        let remaining = self.deadline.checked_duration_since(Instant::now())?;
        if remaining.is_zero() {
            return None;
        }
        self.attempts += 1;
        Some(remaining)
    }

    pub fn handshake_timeout(&self) -> TcpError {
        warn!("handshake gave up after {} attempts ({:?})", self.attempts, self.elapsed());
        TcpError::HandshakeTimeout {
            attempts: self.attempts,
            elapsed: self.elapsed(),
        }
    }
}

/// Receive until `accept` approves a segment.
///
/// Malformed segments, bad checksums and segments `accept` turns down are
/// dropped and the wait goes on. Returns `Ok(None)` once `budget` is spent.
/// A failing IP layer ends the wait with `TcpError::ReceiveFailure`.
pub fn await_segment<S, F>(
    session: &mut S,
    budget: &mut RecvBudget,
    mut accept: F,
) -> Result<Option<InboundSegment>, TcpError>
where
    S: Session + ?Sized,
    F: FnMut(&InboundSegment) -> bool,
{
    let mut buf = vec![0u8; IP_DATA_MAX_LEN];

    while let Some(timeout) = budget.next_attempt() {
        let datagram = match session.recv(&mut buf, timeout) {
            Ok(datagram) if datagram.len == 0 => {
                warn!("receive failed: datagram layer returned nothing");
                return Err(TcpError::ReceiveFailure(Error::new(
                    ErrorKind::UnexpectedEof,
                    "datagram layer received zero bytes",
                )));
            }
            Ok(datagram) => datagram,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => continue,
            Err(err) => {
                warn!("receive failed: {}", err);
                return Err(TcpError::ReceiveFailure(err));
            }
        };

        let Some(bytes) = buf.get(..datagram.len) else {
            warn!("receive failed: datagram layer claimed {} bytes into a {} byte buffer", datagram.len, buf.len());
            return Err(TcpError::ReceiveFailure(Error::new(
                ErrorKind::InvalidData,
                "datagram length exceeds receive buffer",
            )));
        };
        trace!("rx {}: {}", datagram.source, hex::encode(bytes));

        let segment = match InboundSegment::decode(session, datagram.source, bytes) {
            Ok(segment) => segment,
            Err(reason) => {
                debug!("dropping segment from {}: {}", datagram.source, reason);
                continue;
            }
        };

        if accept(&segment) {
            return Ok(Some(segment));
        }

        debug!(
            "discarding {} from {}:{} to port {} (seq={} ack={})",
            segment.tcph.flags_str(),
            segment.source,
            segment.tcph.src_port,
            segment.tcph.dst_port,
            segment.tcph.seq_no,
            segment.tcph.ack_no
        );
    }

    Ok(None)
}

// -- Unit tests --
