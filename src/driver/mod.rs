//! # u-blox Driver Engine
//!
//! Ties the receive loop and the configuration sequencer to one port.
//!
//! The engine is single-threaded and never blocks: the caller invokes
//! [`UbloxDriver::tick`] whenever input may have arrived or time has passed.
//! Each tick first drains received bytes, then lets the sequencer advance.
//! Acknowledgements decoded by the receive loop are therefore visible to the
//! sequencer in the same tick.

pub mod receiver;
pub mod sequencer;

use std::time::Instant;
use tracing::{info, warn};

use crate::config::GpsConfig;
use crate::navigation::NavigationSolution;
use crate::serial::GpsPort;
use crate::ubx::ack::AckTracker;
use crate::ubx::decoder::DecoderStats;
use crate::ubx::protocol::HardwareGeneration;
use receiver::Receiver;
use sequencer::{ConfigSequencer, SequencerPhase};

/// u-blox receiver driver
#[derive(Debug)]
pub struct UbloxDriver {
    receiver: Receiver,
    sequencer: ConfigSequencer,
    ack: AckTracker,
    solution_ready: bool,
}

impl UbloxDriver {
    /// Create a driver that will configure the receiver on its first ticks
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Instant;
    /// use ubx_nav::config::GpsConfig;
    /// use ubx_nav::driver::UbloxDriver;
    /// use ubx_nav::serial::BufferedTransport;
    ///
    /// let mut driver = UbloxDriver::new(GpsConfig::default());
    /// let mut port = BufferedTransport::new(115200);
    ///
    /// driver.tick(&mut port, Instant::now());
    /// assert!(driver.take_solution().is_none());
    /// ```
    pub fn new(config: GpsConfig) -> Self {
        Self {
            receiver: Receiver::new(),
            sequencer: ConfigSequencer::new(config),
            ack: AckTracker::new(),
            solution_ready: false,
        }
    }

    /// Run the receive loop, then the sequencer
    pub fn tick<P: GpsPort + ?Sized>(&mut self, port: &mut P, now: Instant) {
        if self.receiver.pump(port, &mut self.ack) {
            self.solution_ready = true;
        }

        let was_done = self.sequencer.is_done();
        self.sequencer
            .poll(port, &mut self.ack, self.receiver.capabilities(), now);
        if !was_done && self.sequencer.is_done() {
            info!("GPS ready ({:?})", self.receiver.capabilities().generation());
        }
    }

    /// Take the pending solution, once per completed solution
    ///
    /// Nothing is delivered until configuration has finished; a solution
    /// completed during configuration is held until then.
    pub fn take_solution(&mut self) -> Option<&NavigationSolution> {
        if self.solution_ready && self.sequencer.is_done() {
            self.solution_ready = false;
            Some(self.receiver.solution())
        } else {
            None
        }
    }

    /// Latest solution values, whether or not they were delivered
    pub fn solution(&self) -> &NavigationSolution {
        self.receiver.solution()
    }

    /// Reinitialize decoder, acknowledgement slot, capabilities and
    /// sequencer
    ///
    /// The caller should clear the port's buffered input as well; the
    /// decoder restarts from the sync search either way.
    pub fn restart(&mut self) {
        warn!("Restarting GPS driver");
        self.receiver.reset();
        self.sequencer.reset();
        self.ack.reset();
        self.solution_ready = false;
    }

    pub fn stats(&self) -> DecoderStats {
        self.receiver.stats()
    }

    pub fn hardware_generation(&self) -> HardwareGeneration {
        self.receiver.capabilities().generation()
    }

    pub fn supports_galileo(&self) -> bool {
        self.receiver.capabilities().supports_galileo()
    }

    /// Configuration sequence has finished
    pub fn is_configured(&self) -> bool {
        self.sequencer.is_done()
    }

    pub fn sequencer_phase(&self) -> SequencerPhase {
        self.sequencer.phase()
    }
}
