//! Collaborators the client talks to: the datagram sink and the entropy source.
//!
//! The state machine never receives on its own; drivers feed inbound
//! datagrams into [`Client::on_data`](crate::Client::on_data).

use rand::RngCore;

use crate::error::Result;

/// Outbound half of a datagram transport.
pub trait Transport {
    /// Hand one fully encoded datagram to the network.
    fn send(&mut self, datagram: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        (**self).send(datagram)
    }
}

/// Source of the random initial outbound sequence number.
pub trait EntropySource {
    /// Return a random 32-bit value.
    fn random_u32(&mut self) -> u32;
}

impl<F: FnMut() -> u32> EntropySource for F {
    fn random_u32(&mut self) -> u32 {
        self()
    }
}

/// [`EntropySource`] backed by the thread-local `rand` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn random_u32(&mut self) -> u32 {
        rand::rng().next_u32()
    }
}

/// Blocking UDP driver.
#[cfg(feature = "blocking")]
pub mod blocking;

/// Tokio UDP driver.
#[cfg(feature = "async")]
pub mod tokio;
