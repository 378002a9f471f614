use crate::ip::{Session, SessionFactory};
use crate::tcp::config::TcpConfig;
use crate::tcp::conn::Connection;
use crate::tcp::errors::TcpError;
use crate::tcp::flags::TcpFlags;
use crate::tcp::segment::{await_segment, RecvBudget, TcpSegment};
use crate::tcp::state::TcpState;
use crate::tcp::wrap32::Wrap32;
use log::debug;
use rand::rngs::ThreadRng;
use rand::Rng;
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};

/// Drives the three-way handshake.
///
/// Initial sequence numbers come from `R`. Every wait for the peer is bounded
/// by the `TcpConfig` budget.
#[derive(Debug)]
pub struct Handshake<R = ThreadRng> {
    config: TcpConfig,
    rng: R,
}

impl Handshake<ThreadRng> {
    pub fn new(config: TcpConfig) -> Self {
        Self::with_rng(config, rand::thread_rng())
    }
}

impl<R: Rng> Handshake<R> {
    pub fn with_rng(config: TcpConfig, rng: R) -> Self {
        Handshake { config, rng }
    }

    /// Active open: SYN, wait for SYN-ACK, ACK.
    ///
    /// The connection is bound to `session`. Pass `&mut session` to keep the
    /// session when the handshake fails.
    pub fn connect<S: Session>(
        &mut self,
        mut session: S,
        dst_ip: IpAddr,
        dst_port: u16,
    ) -> Result<Connection<S>, TcpError> {
        let local = SocketAddr::new(session.descriptor().address, session.descriptor().port);
        let remote = SocketAddr::new(dst_ip, dst_port);
        let isn = self.initial_seq_no();

        // SYN
        TcpSegment::new(local.port(), remote.port())
            .seq_no(isn)
            .ack_no(Wrap32::new(0))
            .tcp_flags(TcpFlags::SYN)
            .window_size(self.config.window)
            .send(&mut session, dst_ip)?;
        transition(local, remote, TcpState::Closed, TcpState::SynSent);

        // SYN-ACK
        let expected_ack = isn + 1;
        let mut budget = RecvBudget::new(&self.config);
        let syn_ack = await_segment(&mut session, &mut budget, |seg| {
            seg.is_from(remote)
                && seg.tcph.dst_port == local.port()
                && seg.tcph.flags.is_syn_ack()
                && seg.tcph.ack_no == expected_ack
        })?
        .ok_or_else(|| budget.handshake_timeout())?;

        // ACK
        let seq_no = syn_ack.tcph.ack_no;
        let ack_no = syn_ack.tcph.seq_no + 1;
        TcpSegment::new(local.port(), remote.port())
            .seq_no(seq_no)
            .ack_no(ack_no)
            .tcp_flags(TcpFlags::ACK)
            .window_size(self.config.window)
            .send(&mut session, dst_ip)?;
        transition(local, remote, TcpState::SynSent, TcpState::Established);

        Ok(Connection {
            state: TcpState::Established,
            local_sequence: seq_no,
            remote_acknowledged: syn_ack.tcph.seq_no,
            send_next: seq_no,
            receive_next: ack_no,
            local,
            remote,
            session,
            config: self.config.clone(),
            peer_closed: false,
            pending: VecDeque::new(),
        })
    }

    /// Passive open: wait for SYN, SYN-ACK, wait for ACK.
    ///
    /// `session` only carries the handshake. The returned connection is bound
    /// to a fresh session from `factory` on the same interface and port.
    pub fn listen<S, F>(
        &mut self,
        session: &mut S,
        factory: &mut F,
        bind_ip: IpAddr,
        bind_port: u16,
    ) -> Result<Connection<F::Session>, TcpError>
    where
        S: Session,
        F: SessionFactory,
    {
        let local = SocketAddr::new(bind_ip, bind_port);
        debug!("{}: state={}=>{}", local, TcpState::Closed, TcpState::Listen);

        // SYN
        let mut budget = RecvBudget::new(&self.config);
        let syn = await_segment(session, &mut budget, |seg| {
            seg.tcph.dst_port == bind_port && seg.tcph.flags.is_pure_syn()
        })?
        .ok_or_else(|| budget.handshake_timeout())?;
        let remote = SocketAddr::new(syn.source, syn.tcph.src_port);

        // SYN-ACK
        let isn = self.initial_seq_no();
        let ack_no = syn.tcph.seq_no + 1;
        TcpSegment::new(bind_port, remote.port())
            .seq_no(isn)
            .ack_no(ack_no)
            .tcp_flags(TcpFlags::SYN | TcpFlags::ACK)
            .window_size(self.config.window)
            .send(session, remote.ip())?;
        transition(local, remote, TcpState::Listen, TcpState::SynRcvd);

        // ACK
        let expected_ack = isn + 1;
        let mut budget = RecvBudget::new(&self.config);
        let ack = await_segment(session, &mut budget, |seg| {
            seg.is_from(remote)
                && seg.tcph.dst_port == bind_port
                && seg.tcph.flags.is_pure_ack()
                && seg.tcph.ack_no == expected_ack
                && seg.tcph.seq_no == ack_no
        })?
        .ok_or_else(|| budget.handshake_timeout())?;

        let descriptor = session.descriptor();
        let accepted = factory
            .open(&descriptor.interface, bind_port, descriptor.protocol)
            .map_err(TcpError::SessionUnavailable)?;
        transition(local, remote, TcpState::SynRcvd, TcpState::Established);

        Ok(Connection {
            state: TcpState::Established,
            local_sequence: isn,
            remote_acknowledged: ack.tcph.seq_no + 1,
            send_next: expected_ack,
            receive_next: ack_no,
            local,
            remote,
            session: accepted,
            config: self.config.clone(),
            peer_closed: false,
            pending: VecDeque::new(),
        })
    }

    fn initial_seq_no(&mut self) -> Wrap32 {
        Wrap32::new(self.rng.gen())
    }
}

fn transition(local: SocketAddr, remote: SocketAddr, from: TcpState, to: TcpState) {
    debug!("{} -> {}: state={}=>{}", local, remote, from, to);
}

// -- Unit tests --
