//! Test doubles for the IP layer.

use crate::ip::checksum::pseudo_header_checksum;
use crate::ip::{Datagram, Session, SessionDescriptor, SessionFactory, IP_PROTOCOL_TCP};
use crate::tcp::header::TcpHeader;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::io::{Error, ErrorKind};
use std::net::{IpAddr, Ipv4Addr};
use std::thread;
use std::time::Duration;

pub const LOCAL: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
pub const PEER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
pub const INTERFACE: &str = "eth0";

/// One call into the IP layer, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Checksum(Vec<u8>),
    Send(IpAddr, Vec<u8>),
    Recv,
}

#[derive(Debug, Clone, Copy)]
enum SendOutcome {
    Zero,
    Fail(ErrorKind),
}

/// A session that plays back a script of inbound datagrams and records
/// every call made into it. Receives on an empty script time out after at
/// most a millisecond.
#[derive(Debug)]
pub struct ScriptedSession {
    descriptor: SessionDescriptor,
    inbox: VecDeque<Result<(Vec<u8>, IpAddr), Error>>,
    send_outcome: Option<SendOutcome>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl ScriptedSession {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self::on_interface(INTERFACE, address, port)
    }

    pub fn on_interface(interface: &str, address: IpAddr, port: u16) -> Self {
        ScriptedSession {
            descriptor: SessionDescriptor {
                interface: interface.to_string(),
                address,
                protocol: IP_PROTOCOL_TCP,
                port,
            },
            inbox: VecDeque::new(),
            send_outcome: None,
            calls: Rc::new(RefCell::new(vec![])),
        }
    }

    /// Encode a segment as `source` would have sent it to this session.
    pub fn segment_bytes(&self, source: IpAddr, tcph: &TcpHeader, payload: &[u8]) -> Vec<u8> {
        let mut tcph = tcph.clone();
        tcph.checksum = 0;
        let mut bytes = tcph.to_bytes().unwrap();
        bytes.extend_from_slice(payload);

        let checksum = pseudo_header_checksum(source, self.descriptor.address, IP_PROTOCOL_TCP, &bytes);
        TcpHeader::set_checksum(&mut bytes, checksum).unwrap();
        bytes
    }

    pub fn push_segment(&mut self, source: IpAddr, tcph: &TcpHeader, payload: &[u8]) {
        let bytes = self.segment_bytes(source, tcph, payload);
        self.push_raw(source, bytes);
    }

    pub fn push_raw(&mut self, source: IpAddr, bytes: Vec<u8>) {
        self.inbox.push_back(Ok((bytes, source)));
    }

    pub fn push_error(&mut self, err: Error) {
        self.inbox.push_back(Err(err));
    }

    pub fn fail_sends_with_zero(&mut self) {
        self.send_outcome = Some(SendOutcome::Zero);
    }

    pub fn fail_sends_with(&mut self, kind: ErrorKind) {
        self.send_outcome = Some(SendOutcome::Fail(kind));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// A handle on the call log that outlives the session.
    pub fn call_log(&self) -> Rc<RefCell<Vec<Call>>> {
        Rc::clone(&self.calls)
    }

    pub fn recv_calls(&self) -> usize {
        self.calls.borrow().iter().filter(|call| **call == Call::Recv).count()
    }

    /// Raw bytes of every datagram sent so far.
    pub fn sent_bytes(&self) -> Vec<Vec<u8>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Send(_, bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Headers of every segment sent so far.
    pub fn sent(&self) -> Vec<TcpHeader> {
        self.sent_bytes()
            .iter()
            .map(|bytes| TcpHeader::parse(bytes).unwrap())
            .collect()
    }
}

impl Session for ScriptedSession {
    fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    fn send(&mut self, dst: IpAddr, _protocol: u8, payload: &[u8]) -> Result<usize, Error> {
        self.calls.borrow_mut().push(Call::Send(dst, payload.to_vec()));
        match self.send_outcome {
            None => Ok(payload.len()),
            Some(SendOutcome::Zero) => Ok(0),
            Some(SendOutcome::Fail(kind)) => Err(Error::from(kind)),
        }
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Datagram, Error> {
        self.calls.borrow_mut().push(Call::Recv);
        match self.inbox.pop_front() {
            Some(Ok((bytes, source))) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(Datagram { len, source })
            }
            Some(Err(err)) => Err(err),
            None => {
                // Idle wire
                thread::sleep(timeout.min(Duration::from_millis(1)));
                Err(Error::from(ErrorKind::TimedOut))
            }
        }
    }

    fn checksum(&self, dst: IpAddr, protocol: u8, payload: &[u8]) -> u16 {
        self.calls.borrow_mut().push(Call::Checksum(payload.to_vec()));
        pseudo_header_checksum(self.descriptor.address, dst, protocol, payload)
    }
}

/// Hands out fresh scripted sessions and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct FakeFactory {
    pub opened: Vec<(String, u16, u8)>,
    pub fail: bool,
}

impl SessionFactory for FakeFactory {
    type Session = ScriptedSession;

    fn open(&mut self, interface: &str, port: u16, protocol: u8) -> Result<ScriptedSession, Error> {
        self.opened.push((interface.to_string(), port, protocol));
        if self.fail {
            return Err(Error::new(ErrorKind::AddrInUse, "port taken"));
        }
        Ok(ScriptedSession::on_interface(interface, LOCAL, port))
    }
}
