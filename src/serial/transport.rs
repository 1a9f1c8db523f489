//! # Engine Transport
//!
//! The driver engine never blocks, so it talks to the receiver through a
//! synchronous byte interface. [`BufferedTransport`] implements that
//! interface over in-memory queues which the async serial pump fills and
//! drains between engine ticks.

use bytes::{Buf, BytesMut};
use std::collections::VecDeque;

/// Byte-level port used by the driver engine
#[cfg_attr(test, mockall::automock)]
pub trait GpsPort {
    /// Number of received bytes ready to read
    fn bytes_available(&self) -> usize;

    /// Next received byte, if any
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue bytes for transmission
    fn write_bytes(&mut self, data: &[u8]);

    /// Everything queued so far has left the port
    fn is_transmit_buffer_empty(&self) -> bool;

    /// Switch the port's baud rate
    ///
    /// Takes effect after previously queued bytes have been sent.
    fn set_baud_rate(&mut self, baud_rate: u32);
}

/// Port operation waiting for the async side, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortOp {
    Write(Vec<u8>),
    SetBaud(u32),
}

/// In-memory [`GpsPort`] bridging the engine and the serial pump
#[derive(Debug)]
pub struct BufferedTransport {
    rx: BytesMut,
    ops: VecDeque<PortOp>,
    baud_rate: u32,
}

impl BufferedTransport {
    pub fn new(baud_rate: u32) -> Self {
        Self {
            rx: BytesMut::with_capacity(1024),
            ops: VecDeque::new(),
            baud_rate,
        }
    }

    /// Append bytes read from the serial port
    pub fn push_received(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    /// Take all pending operations in issue order
    pub fn take_ops(&mut self) -> Vec<PortOp> {
        self.ops.drain(..).collect()
    }

    pub fn has_pending_ops(&self) -> bool {
        !self.ops.is_empty()
    }

    /// Baud rate most recently requested by the engine
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Drop buffered input and pending operations
    pub fn clear(&mut self) {
        self.rx.clear();
        self.ops.clear();
    }
}

impl GpsPort for BufferedTransport {
    fn bytes_available(&self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.rx.has_remaining() {
            Some(self.rx.get_u8())
        } else {
            None
        }
    }

    fn write_bytes(&mut self, data: &[u8]) {
        // Adjacent writes coalesce; a baud change stays a barrier between them
        if let Some(PortOp::Write(pending)) = self.ops.back_mut() {
            pending.extend_from_slice(data);
        } else {
            self.ops.push_back(PortOp::Write(data.to_vec()));
        }
    }

    fn is_transmit_buffer_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn set_baud_rate(&mut self, baud_rate: u32) {
        self.baud_rate = baud_rate;
        self.ops.push_back(PortOp::SetBaud(baud_rate));
    }
}
