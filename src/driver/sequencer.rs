//! # Configuration Sequencer
//!
//! Brings a freshly connected receiver into the configuration the driver
//! expects, as an explicit state machine advanced on every engine tick:
//!
//! 1. Wait for the transmit buffer to drain.
//! 2. Baud rate: either sweep every supported rate sending the switch
//!    sentence for the target rate, or set the target rate directly.
//! 3. Hardware detection: poll MON-VER with bounded retries.
//! 4. Run the configuration plan for the detected generation, one command
//!    in flight at a time.
//!
//! Every wait has a deadline. When it expires the step is abandoned and the
//! sequence moves on; a partially configured receiver still delivers data.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{GpsConfig, Provider, SUPPORTED_BAUD_RATES};
use crate::serial::GpsPort;
use crate::ubx::ack::{AckOutcome, AckTracker};
use crate::ubx::encoder::{baud_change_sentence, CommandEncoder, GnssConfigBlock, UbxCommand};
use crate::ubx::interpreter::HardwareCapabilities;
use crate::ubx::protocol::*;

/// Acknowledgement a configuration step waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckWait {
    /// Only ACK-ACK completes the step; a NACK waits out the timeout
    RequireAck,
    /// Any answer completes the step
    AckOrNack,
}

impl AckWait {
    fn is_satisfied(self, outcome: AckOutcome) -> bool {
        match self {
            AckWait::RequireAck => outcome == AckOutcome::Acked,
            AckWait::AckOrNack => matches!(outcome, AckOutcome::Acked | AckOutcome::Nacked),
        }
    }
}

/// One command of the configuration plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStep {
    pub command: UbxCommand,
    pub wait: AckWait,
    pub timeout: Duration,
}

/// Where the sequencer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerPhase {
    /// Waiting for earlier output to leave the port
    WaitTxIdle,
    /// Switch to candidate rate `index` and send the switch sentence
    AutobaudSend { index: usize },
    /// Waiting for the switch sentence to leave the port
    AutobaudDrain { index: usize },
    /// Giving the receiver time to apply the switch
    AutobaudSettle { index: usize, until: Instant },
    /// Send version poll number `attempt` (0-based)
    PollVersion { attempt: u32 },
    /// Waiting for MON-VER after `attempts` polls
    AwaitVersion { attempts: u32, deadline: Instant },
    /// Send plan step `index`
    RunStep { index: usize },
    /// Waiting for the answer to plan step `index`
    AwaitStep { index: usize, deadline: Instant },
    /// Steady state
    Done,
}

/// Build the configuration plan for a receiver
///
/// # Arguments
///
/// * `config` - Driver settings
/// * `capabilities` - What MON-VER reported (generation may be unknown)
///
/// # Returns
///
/// * `Vec<ConfigStep>` - Commands in transmission order
pub fn build_config_plan(config: &GpsConfig, capabilities: HardwareCapabilities) -> Vec<ConfigStep> {
    let generation = capabilities.generation();
    let require = |command| ConfigStep {
        command,
        wait: AckWait::RequireAck,
        timeout: config.ack_timeout,
    };
    let tolerate = |command| ConfigStep {
        command,
        wait: AckWait::AckOrNack,
        timeout: config.command_timeout,
    };
    let nav = |id, rate| UbxCommand::SetMessageRate { class: CLASS_NAV, id, rate };

    let mut plan = vec![require(UbxCommand::SetNavSettings { dynamics: config.dynamics })];

    for &id in NMEA_SENTENCE_IDS.iter() {
        plan.push(require(UbxCommand::SetMessageRate { class: CLASS_NMEA, id, rate: 0 }));
    }

    if generation >= HardwareGeneration::Ublox9 {
        plan.push(require(nav(MSG_NAV_POSLLH, 0)));
        plan.push(require(nav(MSG_NAV_STATUS, 0)));
        plan.push(require(nav(MSG_NAV_VELNED, 0)));
        plan.push(require(nav(MSG_NAV_TIMEUTC, 0)));
        plan.push(require(nav(MSG_NAV_PVT, 1)));
        plan.push(require(nav(MSG_NAV_SAT, 0)));
        plan.push(require(nav(MSG_NAV_SIG, 0)));
        plan.push(require(UbxCommand::SetRate { meas_rate_ms: 200 }));
    } else if generation >= HardwareGeneration::Ublox7 {
        plan.push(require(nav(MSG_NAV_POSLLH, 0)));
        plan.push(require(nav(MSG_NAV_STATUS, 0)));
        plan.push(require(nav(MSG_NAV_SOL, 1)));
        plan.push(require(nav(MSG_NAV_VELNED, 0)));
        plan.push(require(nav(MSG_NAV_TIMEUTC, 0)));
        plan.push(require(nav(MSG_NAV_PVT, 1)));
        plan.push(require(nav(MSG_NAV_SVINFO, 0)));
        let meas_rate_ms = if config.provider == Provider::Ublox7Plus { 100 } else { 200 };
        plan.push(require(UbxCommand::SetRate { meas_rate_ms }));
    } else {
        // u-blox 5/6 or unidentified: no on-change output, PVT may be unknown
        plan.push(require(nav(MSG_NAV_POSLLH, 1)));
        plan.push(require(nav(MSG_NAV_STATUS, 1)));
        plan.push(require(nav(MSG_NAV_SOL, 1)));
        plan.push(require(nav(MSG_NAV_VELNED, 1)));
        plan.push(require(nav(MSG_NAV_TIMEUTC, 10)));
        plan.push(tolerate(nav(MSG_NAV_PVT, 0)));
        plan.push(require(nav(MSG_NAV_SVINFO, 0)));
        plan.push(require(UbxCommand::SetRate { meas_rate_ms: 200 }));
    }

    plan.push(tolerate(UbxCommand::SetSbas(config.sbas)));

    if generation >= HardwareGeneration::Ublox8 {
        let galileo = capabilities.supports_galileo() && config.use_galileo;
        match GnssConfigBlock::for_receiver(config.sbas, galileo) {
            Ok(blocks) => plan.push(tolerate(UbxCommand::SetGnss(blocks))),
            Err(e) => warn!("Skipping GNSS configuration: {}", e),
        }
    }

    plan
}

/// Deadline-driven configuration state machine
#[derive(Debug)]
pub struct ConfigSequencer {
    config: GpsConfig,
    phase: SequencerPhase,
    plan: Vec<ConfigStep>,
    encoder: CommandEncoder,
}

impl ConfigSequencer {
    pub fn new(config: GpsConfig) -> Self {
        Self {
            config,
            phase: SequencerPhase::WaitTxIdle,
            plan: Vec::new(),
            encoder: CommandEncoder::new(),
        }
    }

    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == SequencerPhase::Done
    }

    /// Plan in use, empty until hardware detection has finished
    pub fn plan(&self) -> &[ConfigStep] {
        &self.plan
    }

    /// Start over from the first phase
    pub fn reset(&mut self) {
        self.phase = SequencerPhase::WaitTxIdle;
        self.plan.clear();
    }

    /// Advance as far as possible without waiting
    ///
    /// # Arguments
    ///
    /// * `port` - Receiver port
    /// * `ack` - Acknowledgement slot shared with the receive loop
    /// * `capabilities` - Hardware identification learned so far
    /// * `now` - Current time, compared against phase deadlines
    pub fn poll<P: GpsPort + ?Sized>(
        &mut self,
        port: &mut P,
        ack: &mut AckTracker,
        capabilities: HardwareCapabilities,
        now: Instant,
    ) {
        while let Some(next) = self.step(port, ack, capabilities, now) {
            debug!("Sequencer {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }

    /// One transition, or `None` while the current phase is blocked
    fn step<P: GpsPort + ?Sized>(
        &mut self,
        port: &mut P,
        ack: &mut AckTracker,
        capabilities: HardwareCapabilities,
        now: Instant,
    ) -> Option<SequencerPhase> {
        match self.phase {
            SequencerPhase::WaitTxIdle => {
                if !port.is_transmit_buffer_empty() {
                    return None;
                }
                if self.config.auto_baud {
                    info!("Searching receiver baud rate, target {}", self.config.target_baud);
                    Some(SequencerPhase::AutobaudSend { index: 0 })
                } else {
                    port.set_baud_rate(self.config.target_baud);
                    Some(self.after_baud())
                }
            }

            SequencerPhase::AutobaudSend { index } => {
                port.set_baud_rate(SUPPORTED_BAUD_RATES[index]);
                port.write_bytes(baud_change_sentence(self.config.target_baud).as_bytes());
                Some(SequencerPhase::AutobaudDrain { index })
            }

            SequencerPhase::AutobaudDrain { index } => {
                if !port.is_transmit_buffer_empty() {
                    return None;
                }
                Some(SequencerPhase::AutobaudSettle {
                    index,
                    until: now + self.config.baud_change_delay,
                })
            }

            SequencerPhase::AutobaudSettle { index, until } => {
                if now < until {
                    return None;
                }
                if index + 1 < SUPPORTED_BAUD_RATES.len() {
                    Some(SequencerPhase::AutobaudSend { index: index + 1 })
                } else {
                    port.set_baud_rate(self.config.target_baud);
                    Some(self.after_baud())
                }
            }

            SequencerPhase::PollVersion { attempt } => {
                debug!("Polling receiver version (attempt {})", attempt + 1);
                self.send(port, ack, &UbxCommand::PollVersion);
                Some(SequencerPhase::AwaitVersion {
                    attempts: attempt + 1,
                    deadline: now + self.config.command_timeout,
                })
            }

            SequencerPhase::AwaitVersion { attempts, deadline } => {
                if !capabilities.generation().is_known() {
                    if now < deadline {
                        return None;
                    }
                    if attempts < self.config.version_retries {
                        return Some(SequencerPhase::PollVersion { attempt: attempts });
                    }
                    warn!(
                        "Receiver did not identify itself after {} polls, using legacy configuration",
                        attempts
                    );
                }

                self.plan = build_config_plan(&self.config, capabilities);
                info!(
                    "Configuring {:?} receiver ({} commands)",
                    capabilities.generation(),
                    self.plan.len()
                );
                Some(SequencerPhase::RunStep { index: 0 })
            }

            SequencerPhase::RunStep { index } => {
                let Some(step) = self.plan.get(index) else {
                    info!("Receiver configuration complete");
                    return Some(SequencerPhase::Done);
                };
                let command = step.command.clone();
                let timeout = step.timeout;
                self.send(port, ack, &command);
                Some(SequencerPhase::AwaitStep {
                    index,
                    deadline: now + timeout,
                })
            }

            SequencerPhase::AwaitStep { index, deadline } => {
                let step = self.plan.get(index)?;
                if step.wait.is_satisfied(ack.outcome()) {
                    if ack.outcome() == AckOutcome::Nacked {
                        debug!("{:?} rejected, continuing", step.command.class_id());
                    }
                    return Some(SequencerPhase::RunStep { index: index + 1 });
                }
                if now < deadline {
                    return None;
                }
                let (class, id) = step.command.class_id();
                warn!(
                    "No {} for 0x{:02X}/0x{:02X} within {:?}, skipping",
                    if step.wait == AckWait::RequireAck { "ACK" } else { "answer" },
                    class,
                    id,
                    step.timeout
                );
                Some(SequencerPhase::RunStep { index: index + 1 })
            }

            SequencerPhase::Done => None,
        }
    }

    fn after_baud(&self) -> SequencerPhase {
        if self.config.auto_config {
            SequencerPhase::PollVersion { attempt: 0 }
        } else {
            info!("Receiver auto-configuration disabled");
            SequencerPhase::Done
        }
    }

    fn send<P: GpsPort + ?Sized>(&mut self, port: &mut P, ack: &mut AckTracker, command: &UbxCommand) {
        let (class, id) = command.class_id();
        port.write_bytes(self.encoder.encode(command));
        ack.begin(class, id);
        debug!("Sent UBX 0x{:02X}/0x{:02X}", class, id);
    }
}
