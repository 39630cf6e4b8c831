use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::net::UdpSocket;

use crate::client::{Client, Status};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Maximum UDP payload we accept.
const DEFAULT_MAX_PACKET_SIZE: usize = 4096;

/// Tokio UDP transport for RMCP/IPMI.
///
/// The state machine is synchronous, so [`Transport::send`] only queues the
/// datagram; [`Client::run_until_idle`] flushes the queue on the socket.
#[derive(Debug)]
pub struct AsyncUdpTransport {
    socket: UdpSocket,
    outbox: VecDeque<Vec<u8>>,
    max_packet_size: usize,
}

impl AsyncUdpTransport {
    /// Connect a UDP socket to an RMCP target.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let bind_addr = match target {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;

        Ok(Self {
            socket,
            outbox: VecDeque::new(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        })
    }

    /// Send queued datagrams in order. A datagram leaves the queue only once
    /// the socket has taken it.
    async fn flush(&mut self) -> Result<()> {
        while let Some(datagram) = self.outbox.front() {
            self.socket.send(datagram).await?;
            self.outbox.pop_front();
        }
        Ok(())
    }

    /// Datagrams queued but not yet on the wire.
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }
}

impl Transport for AsyncUdpTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        self.outbox.push_back(datagram.to_vec());
        Ok(())
    }
}

impl Client<AsyncUdpTransport> {
    /// Drive the session until every queued command has been answered.
    pub async fn run_until_idle(&mut self) -> Result<()> {
        if !self.is_connected() {
            self.on_connected();
        }

        loop {
            self.transport_mut().flush().await?;

            if self.is_abandoned() {
                return Err(Error::SessionAbandoned);
            }
            if self.is_idle() {
                return Ok(());
            }

            let Some(deadline) = self.deadline() else {
                self.retransmit();
                continue;
            };

            let mut buf = vec![0u8; self.transport().max_packet_size];
            let received = tokio::time::timeout_at(
                tokio::time::Instant::from_std(deadline),
                self.transport().socket.recv(&mut buf),
            )
            .await;

            match received {
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    self.on_data(&buf);
                }
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_elapsed) => {
                    if let Status::Failed { .. } = self.on_timeout(Instant::now()) {
                        self.retransmit();
                    }
                }
            }
        }
    }
}
