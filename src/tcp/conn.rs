use crate::ip::Session;
use crate::tcp::config::TcpConfig;
use crate::tcp::errors::TcpError;
use crate::tcp::flags::TcpFlags;
use crate::tcp::segment::{await_segment, RecvBudget, TcpSegment};
use crate::tcp::state::TcpState;
use crate::tcp::wrap32::Wrap32;
use log::{debug, warn};
use std::collections::VecDeque;
use std::net::SocketAddr;

/// An established connection, produced by [`crate::tcp::Handshake`].
///
/// `local_sequence` and `remote_acknowledged` are the counters the handshake
/// settled on. `send_next` and `receive_next` are the RFC 793 SND.NXT and
/// RCV.NXT used once data flows.
///
/// The connection owns its session. Dropping the connection drops the session;
/// pass `&mut session` to the handshake to keep it.
#[derive(Debug)]
pub struct Connection<S> {
    pub(crate) state: TcpState,
    pub(crate) local_sequence: Wrap32,
    pub(crate) remote_acknowledged: Wrap32,
    pub(crate) send_next: Wrap32,
    pub(crate) receive_next: Wrap32,
    pub(crate) local: SocketAddr,
    pub(crate) remote: SocketAddr,
    pub(crate) session: S,
    pub(crate) config: TcpConfig,
    pub(crate) peer_closed: bool, // FIN received
    pub(crate) pending: VecDeque<u8>, // Received and acknowledged, not yet read
}

impl<S: Session> Connection<S> {
    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn local_sequence(&self) -> Wrap32 {
        self.local_sequence
    }

    pub fn remote_acknowledged(&self) -> Wrap32 {
        self.remote_acknowledged
    }

    pub fn send_next(&self) -> Wrap32 {
        self.send_next
    }

    pub fn receive_next(&self) -> Wrap32 {
        self.receive_next
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Give up the connection and keep the session.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Send `data`, cut into segments of at most `max_segment_size` bytes.
    /// Returns the number of bytes handed to the IP layer.
    ///
    /// Nothing is retransmitted; a lost segment stays lost.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, TcpError> {
        let mut sent = 0;
        for chunk in data.chunks(self.config.max_segment_size) {
            self.segment(TcpFlags::PSH | TcpFlags::ACK)
                .payload(chunk)
                .send(&mut self.session, self.remote.ip())?;
            self.send_next += chunk.len() as u32;
            sent += chunk.len();
        }
        debug!("{} -> {}: sent {} bytes, snd.nxt={}", self.local, self.remote, sent, self.send_next);
        Ok(sent)
    }

    /// Wait for the next in-order data from the peer and copy it into `buf`.
    ///
    /// Returns `Ok(0)` once the peer has sent FIN and everything before it
    /// was read, or when `buf` is empty. Pure ACKs are absorbed. Segments that
    /// don't start at `receive_next` are dropped. Bytes that don't fit in
    /// `buf` are kept for the next call.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TcpError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.pending.is_empty() {
            return Ok(self.read_pending(buf));
        }
        if self.peer_closed {
            return Ok(0);
        }

        let mut budget = RecvBudget::new(&self.config);
        loop {
            let (local, remote, receive_next) = (self.local, self.remote, self.receive_next);
            let segment = await_segment(&mut self.session, &mut budget, |seg| {
                seg.is_from(remote) && seg.tcph.dst_port == local.port() && seg.tcph.seq_no == receive_next
            })?
            .ok_or(TcpError::ConnectionTimeout)?;

            let flags = segment.tcph.flags;
            if flags.contains(TcpFlags::RST) {
                warn!("{} -> {}: connection reset by peer", self.local, self.remote);
                return Err(TcpError::ConnectionReset);
            }

            if flags.contains(TcpFlags::ACK) {
                self.remote_acknowledged = segment.tcph.ack_no;
            }

            self.pending.extend(&segment.payload);
            self.receive_next += segment.payload.len() as u32;

            let fin = flags.contains(TcpFlags::FIN);
            if fin {
                self.receive_next += 1;
                self.peer_closed = true;
                debug!("{} -> {}: peer closed", self.local, self.remote);
            }

            if !segment.payload.is_empty() || fin {
                self.send_control(TcpFlags::ACK)?;
                return Ok(self.read_pending(buf));
            }
        }
    }

    /// Move as much pending data as fits into `buf`.
    fn read_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        n
    }

    /// Send FIN and wait until the peer acknowledges it.
    pub fn close(mut self) -> Result<(), TcpError> {
        self.send_control(TcpFlags::FIN | TcpFlags::ACK)?;
        let fin_acked = self.send_next;

        let mut budget = RecvBudget::new(&self.config);
        loop {
            let (local, remote, receive_next) = (self.local, self.remote, self.receive_next);
            let segment = await_segment(&mut self.session, &mut budget, |seg| {
                seg.is_from(remote) && seg.tcph.dst_port == local.port() && seg.tcph.seq_no == receive_next
            })?
            .ok_or(TcpError::ConnectionTimeout)?;

            let flags = segment.tcph.flags;
            if flags.contains(TcpFlags::RST) {
                return Err(TcpError::ConnectionReset);
            }

            // Simultaneous close: take the peer's FIN too
            if flags.contains(TcpFlags::FIN) && !self.peer_closed {
                self.receive_next += segment.payload.len() as u32 + 1;
                self.peer_closed = true;
                self.send_control(TcpFlags::ACK)?;
            }

            if flags.contains(TcpFlags::ACK) && segment.tcph.ack_no == fin_acked {
                self.remote_acknowledged = segment.tcph.ack_no;
                break;
            }
        }

        debug!("{} -> {}: closed", self.local, self.remote);
        Ok(())
    }

    /// A segment template at the current send and receive positions.
    fn segment(&self, flags: TcpFlags) -> TcpSegment {
        let mut segment = TcpSegment::new(self.local.port(), self.remote.port());
        segment
            .seq_no(self.send_next)
            .ack_no(self.receive_next)
            .tcp_flags(flags)
            .window_size(self.config.window);
        segment
    }

    /// Send a segment without payload. SYN and FIN use up a sequence number.
    fn send_control(&mut self, flags: TcpFlags) -> Result<(), TcpError> {
        self.segment(flags).send(&mut self.session, self.remote.ip())?;
        self.send_next += flags.seq_len();
        Ok(())
    }
}

// -- Unit tests --
