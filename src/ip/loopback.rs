//! An in-memory IP layer.
//!
//! Interfaces are attached to a [`LoopbackNet`] under a name and an address.
//! Every datagram sent to an address lands in that host's queue, whatever the
//! port, like a raw IP receive would. All sessions opened on the same host
//! read the same queue, so a connection handed over to a freshly opened
//! session never loses datagrams that arrived in between.

use crate::ip::checksum::pseudo_header_checksum;
use crate::ip::session::{Datagram, Session, SessionDescriptor, SessionFactory};
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::net::IpAddr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// (payload, source address)
type Frame = (Vec<u8>, IpAddr);

#[derive(Debug)]
struct Host {
    interface: String,
    tx: Sender<Frame>,
    rx: Arc<Mutex<Receiver<Frame>>>,
}

/// A shared medium connecting any number of attached hosts.
#[derive(Debug, Clone, Default)]
pub struct LoopbackNet {
    hosts: Arc<Mutex<HashMap<IpAddr, Host>>>,
}

impl LoopbackNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an interface named `interface` with the given address.
    pub fn attach(&self, interface: &str, address: IpAddr) -> Result<(), Error> {
        let mut hosts = self.lock_hosts()?;
        if hosts.contains_key(&address) {
            return Err(Error::new(ErrorKind::AddrInUse, format!("{address} already attached")));
        }

        let (tx, rx) = mpsc::channel();
        hosts.insert(
            address,
            Host {
                interface: interface.to_string(),
                tx,
                rx: Arc::new(Mutex::new(rx)),
            },
        );
        Ok(())
    }

    /// Open a session bound to `port` on the interface named `interface`.
    pub fn session(&self, interface: &str, port: u16, protocol: u8) -> Result<LoopbackSession, Error> {
        let hosts = self.lock_hosts()?;
        let (address, host) = hosts
            .iter()
            .find(|(_, host)| host.interface == interface)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no interface named {interface}")))?;

        Ok(LoopbackSession {
            descriptor: SessionDescriptor {
                interface: interface.to_string(),
                address: *address,
                protocol,
                port,
            },
            net: self.clone(),
            rx: Arc::clone(&host.rx),
        })
    }

    fn deliver(&self, dst: IpAddr, frame: Frame) -> Result<(), Error> {
        let hosts = self.lock_hosts()?;
        // Nobody home: the datagram is lost, same as on a real wire
        if let Some(host) = hosts.get(&dst) {
            let _ = host.tx.send(frame);
        }
        Ok(())
    }

    fn lock_hosts(&self) -> Result<std::sync::MutexGuard<'_, HashMap<IpAddr, Host>>, Error> {
        self.hosts
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "loopback host table poisoned"))
    }
}

impl SessionFactory for LoopbackNet {
    type Session = LoopbackSession;

    fn open(&mut self, interface: &str, port: u16, protocol: u8) -> Result<LoopbackSession, Error> {
        self.session(interface, port, protocol)
    }
}

#[derive(Debug)]
pub struct LoopbackSession {
    descriptor: SessionDescriptor,
    net: LoopbackNet,
    rx: Arc<Mutex<Receiver<Frame>>>,
}

impl Session for LoopbackSession {
    fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    fn send(&mut self, dst: IpAddr, _protocol: u8, payload: &[u8]) -> Result<usize, Error> {
        self.net.deliver(dst, (payload.to_vec(), self.descriptor.address))?;
        Ok(payload.len())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Datagram, Error> {
        let rx = self
            .rx
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "loopback queue poisoned"))?;

        match rx.recv_timeout(timeout) {
            Ok((payload, source)) => {
                // Truncate like a datagram socket would
                let len = payload.len().min(buf.len());
                buf[..len].copy_from_slice(&payload[..len]);
                Ok(Datagram { len, source })
            }
            Err(RecvTimeoutError::Timeout) => Err(Error::from(ErrorKind::TimedOut)),
            Err(RecvTimeoutError::Disconnected) => Err(Error::from(ErrorKind::BrokenPipe)),
        }
    }

    fn checksum(&self, dst: IpAddr, protocol: u8, payload: &[u8]) -> u16 {
        pseudo_header_checksum(self.descriptor.address, dst, protocol, payload)
    }
}

// -- Unit tests --
