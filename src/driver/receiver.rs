//! # Receive Loop
//!
//! Pulls bytes from the port through the frame decoder into the packet
//! interpreter.

use crate::navigation::NavigationSolution;
use crate::serial::GpsPort;
use crate::ubx::ack::AckTracker;
use crate::ubx::decoder::{DecoderStats, FrameDecoder};
use crate::ubx::interpreter::{HardwareCapabilities, PacketInterpreter};

/// Decoder and interpreter driven from one byte stream
#[derive(Debug, Default)]
pub struct Receiver {
    decoder: FrameDecoder,
    interpreter: PacketInterpreter,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume available bytes until a solution completes or input runs out
    ///
    /// Stops right after the byte that completed a solution; the rest stays
    /// in the port for the next call.
    ///
    /// # Returns
    ///
    /// * `bool` - True when a new solution is ready
    pub fn pump<P: GpsPort + ?Sized>(&mut self, port: &mut P, ack: &mut AckTracker) -> bool {
        while port.bytes_available() > 0 {
            let Some(byte) = port.read_byte() else {
                break;
            };
            if let Some(frame) = self.decoder.feed(byte) {
                if self.interpreter.apply(&frame, ack) {
                    return true;
                }
            }
        }
        false
    }

    pub fn solution(&self) -> &NavigationSolution {
        self.interpreter.solution()
    }

    pub fn capabilities(&self) -> HardwareCapabilities {
        self.interpreter.capabilities()
    }

    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Back to the initial decoder state with zeroed counters
    ///
    /// The last solution values survive; see [`PacketInterpreter::reset`].
    pub fn reset(&mut self) {
        self.decoder = FrameDecoder::new();
        self.interpreter.reset();
    }
}
