use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

use crate::client::{Client, Status};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Maximum UDP payload we accept.
///
/// IPMI v1.5 packets are small; 4 KiB is a conservative upper bound.
const DEFAULT_MAX_PACKET_SIZE: usize = 4096;

/// Blocking UDP transport for RMCP/IPMI.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    max_packet_size: usize,
}

impl UdpTransport {
    /// Connect a UDP socket to an RMCP target (usually port 623).
    pub fn connect(target: SocketAddr) -> Result<Self> {
        let bind_addr = match target {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(target)?;

        Ok(Self {
            socket,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for one datagram until `deadline`. `Ok(None)` means it passed.
    fn recv_until(&self, deadline: Instant) -> Result<Option<Vec<u8>>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        self.socket.set_read_timeout(Some(remaining))?;

        let mut buf = vec![0u8; self.max_packet_size];
        match self.socket.recv(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        self.socket.send(datagram)?;
        Ok(())
    }
}

impl Client<UdpTransport> {
    /// Drive the session until every queued command has been answered.
    ///
    /// Expired deadlines count as failures and the request is resent.
    /// Returns [`Error::SessionAbandoned`] once the session is given up.
    pub fn run_until_idle(&mut self) -> Result<()> {
        if !self.is_connected() {
            self.on_connected();
        }

        loop {
            if self.is_abandoned() {
                return Err(Error::SessionAbandoned);
            }
            if self.is_idle() {
                return Ok(());
            }

            let Some(deadline) = self.deadline() else {
                // Nothing in flight: a previous send failed.
                self.retransmit();
                continue;
            };

            match self.transport().recv_until(deadline)? {
                Some(datagram) => {
                    self.on_data(&datagram);
                }
                None => {
                    if let Status::Failed { .. } = self.on_timeout(Instant::now()) {
                        self.retransmit();
                    }
                }
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
