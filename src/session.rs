//! Device session and confirmation engine
//!
//! The command channel has no acknowledgment of any kind, so every
//! high-level operation here is built the same way: send the command frame,
//! wait out the broadcast interval, take a fresh status snapshot and check
//! whether the device actually did what was asked. The loop retries on a
//! fixed budget and reports one of three outcomes: confirmed, timed out, or
//! overridden by the device itself.
//!
//! A session owns exactly one device address and one snapshot. All methods
//! take `&mut self`, which keeps two confirmed operations from ever running
//! concurrently against the same device: only one socket can bind the
//! status port, and an overlapping send would make before/after comparisons
//! meaningless since every refresh consumes the next broadcast regardless
//! of who is waiting for it.

use crate::catalog::{
    CommandCatalog, PropertyCatalog, CMD_COOL, CMD_END, CMD_HOLD, CMD_RESTART,
    CMD_SET_AUTOFILL_MODE, CMD_STOP, CMD_TURBO, PROP_AF_LN_LEVEL, PROP_AF_MODE, PROP_GAS_FLOW,
    PROP_MAX_TEMP, PROP_MIN_TEMP, PROP_OUTER_FLOW, PROP_RUN_MODE, PROP_SAMPLE_TEMP,
    PROP_TARGET_TEMP, PROP_TURBO_MODE,
};
use crate::error::{Error, Result};
use crate::protocol::{self, status, CommandFrame, StatusSnapshot};
use crate::transport::Transport;
use crate::types::{
    turbo_device_owned, AutofillMode, Outcome, Policies, RetryPolicy, RunMode, WorkflowOutcome,
    WorkflowStep,
};
use std::net::IpAddr;
use std::thread;

/// Device temperatures travel as centikelvin
const CENTIKELVIN_PER_KELVIN: f64 = 100.0;

/// Pre-send check over the snapshot an attempt starts from
enum Precheck {
    Proceed,
    DeviceOwned,
}

/// Post-refresh judgement over the (before, after) snapshot pair
enum Verdict {
    Met,
    NotMet,
    DeviceOwned,
}

/// A session against one Cryostream 800
///
/// Created once per device and mutated only through [`refresh_status`]
/// (wholesale snapshot replacement) and the confirmed operations.
///
/// [`refresh_status`]: DeviceSession::refresh_status
pub struct DeviceSession<T: Transport> {
    transport: T,
    device_addr: IpAddr,
    properties: PropertyCatalog,
    commands: CommandCatalog,
    policies: Policies,
    snapshot: StatusSnapshot,
}

impl<T: Transport> DeviceSession<T> {
    /// Create a session with the default retry policies
    ///
    /// No network traffic happens here; the snapshot stays empty until the
    /// first [`refresh_status`](DeviceSession::refresh_status).
    pub fn new(transport: T, device_addr: IpAddr) -> Self {
        Self::with_policies(transport, device_addr, Policies::default())
    }

    /// Create a session with explicit retry policies
    pub fn with_policies(transport: T, device_addr: IpAddr, policies: Policies) -> Self {
        Self {
            transport,
            device_addr,
            properties: PropertyCatalog::new(),
            commands: CommandCatalog::new(),
            policies,
            snapshot: StatusSnapshot::default(),
        }
    }

    /// Address of the device this session talks to
    pub fn device_addr(&self) -> IpAddr {
        self.device_addr
    }

    /// The most recently decoded snapshot
    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Block for the next broadcast and replace the snapshot wholesale
    ///
    /// The device broadcasts roughly once per second. Note that the wire
    /// format carries no sequence number or timestamp: under packet loss a
    /// received broadcast can predate a command sent just before this call,
    /// so comparisons against post-command state must wait out a full
    /// broadcast interval first.
    pub fn refresh_status(&mut self) -> Result<()> {
        let payload = self.transport.receive_status(self.device_addr)?;
        let entries = status::decode(&payload)?;
        self.snapshot = StatusSnapshot::build(&entries, &self.properties);
        log::debug!("snapshot refreshed: {} properties", self.snapshot.len());
        Ok(())
    }

    /// Minimum supported temperature in centikelvin (property 1002)
    pub fn min_temperature(&self) -> Result<u16> {
        named(&self.snapshot, PROP_MIN_TEMP)
    }

    /// Maximum supported temperature in centikelvin (property 1003)
    pub fn max_temperature(&self) -> Result<u16> {
        named(&self.snapshot, PROP_MAX_TEMP)
    }

    /// Sample temperature in centikelvin (property 1051)
    pub fn sample_temperature(&self) -> Result<u16> {
        named(&self.snapshot, PROP_SAMPLE_TEMP)
    }

    /// Target temperature in centikelvin (property 1056)
    pub fn target_temperature(&self) -> Result<u16> {
        named(&self.snapshot, PROP_TARGET_TEMP)
    }

    /// Gas flow (property 1060)
    pub fn gas_flow(&self) -> Result<u16> {
        named(&self.snapshot, PROP_GAS_FLOW)
    }

    /// Outer flow (property 2043)
    pub fn outer_flow(&self) -> Result<u16> {
        named(&self.snapshot, PROP_OUTER_FLOW)
    }

    /// Autofill liquid nitrogen level, percent x 100 (property 1203)
    pub fn autofill_ln_level(&self) -> Result<u16> {
        named(&self.snapshot, PROP_AF_LN_LEVEL)
    }

    /// Raw turbo value (property 1068): 0 off, 1 on, 2 or 3 on under
    /// device control
    pub fn turbo_mode(&self) -> Result<u16> {
        named(&self.snapshot, PROP_TURBO_MODE)
    }

    /// Autofill mode (property 1209)
    pub fn autofill_mode(&self) -> Result<AutofillMode> {
        autofill_of(&self.snapshot)
    }

    /// Run mode (property 1053)
    pub fn run_mode(&self) -> Result<RunMode> {
        run_mode_of(&self.snapshot)
    }

    /// True when the device is in Ready or Running mode
    pub fn is_ready_or_running(&self) -> Result<bool> {
        let mode = self.run_mode()?;
        Ok(mode == RunMode::Ready || mode == RunMode::Running)
    }

    // ========================================================================
    // Fire-and-forget commands
    // ========================================================================

    /// Restart the cooler after shutdown; brings it to Ready but does not
    /// start cooling
    pub fn restart(&mut self) -> Result<()> {
        self.launch(CMD_RESTART, 0, 0)
    }

    /// Hold the current temperature indefinitely
    pub fn hold(&mut self) -> Result<()> {
        self.launch(CMD_HOLD, 0, 0)
    }

    /// Change to a new target temperature as fast as possible
    pub fn cool(&mut self, kelvin: f64) -> Result<()> {
        let target = to_centikelvin(kelvin)?;
        self.launch(CMD_COOL, target, target)
    }

    /// Ramp to 300 K at `rate` kelvin per hour (1..=360) and shut down
    pub fn end(&mut self, rate: u16) -> Result<()> {
        self.launch(CMD_END, rate, rate)
    }

    /// Stop the cooler immediately
    pub fn stop(&mut self) -> Result<()> {
        self.launch(CMD_STOP, 0, 0)
    }

    /// Request turbo mode without confirmation
    pub fn set_turbo(&mut self, on: bool) -> Result<()> {
        let mode = on as u16;
        self.launch(CMD_TURBO, mode, mode)
    }

    /// Request an autofill mode without confirmation
    pub fn set_autofill_mode(&mut self, desired: AutofillMode) -> Result<()> {
        let mode = autofill_wire_value(desired)?;
        self.launch(CMD_SET_AUTOFILL_MODE, mode, mode)
    }

    /// Send any cataloged command by name, unconfirmed
    pub fn send_named(&mut self, name: &str, param1: u16, param2: u16) -> Result<()> {
        let code = self
            .commands
            .code(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
        self.launch(code, param1, param2)
    }

    fn launch(&mut self, code: u16, param1: u16, param2: u16) -> Result<()> {
        let frame = protocol::encode(code, param1, param2);
        log::debug!(
            "command {}: params ({}, {})",
            code,
            param1,
            param2
        );
        self.transport.send_command(&frame, self.device_addr)
    }

    // ========================================================================
    // Confirmed operations
    // ========================================================================

    /// Restart and poll until the device reports Ready
    pub fn restart_confirmed(&mut self) -> Result<Outcome> {
        let frame = protocol::encode(CMD_RESTART, 0, 0);
        let policy = self.policies.restart;
        self.run_confirmed("restart", frame, policy, |_| Ok(Precheck::Proceed), |_, after| {
            Ok(if run_mode_of(after)? == RunMode::Ready {
                Verdict::Met
            } else {
                Verdict::NotMet
            })
        })
    }

    /// Stop and poll until the device reports a clean shutdown
    pub fn stop_confirmed(&mut self) -> Result<Outcome> {
        let frame = protocol::encode(CMD_STOP, 0, 0);
        let policy = self.policies.stop;
        self.run_confirmed("stop", frame, policy, |_| Ok(Precheck::Proceed), |_, after| {
            Ok(if run_mode_of(after)? == RunMode::ShutdownNoError {
                Verdict::Met
            } else {
                Verdict::NotMet
            })
        })
    }

    /// Set a target temperature and poll until the device echoes it and
    /// reports Running
    ///
    /// The temperature is validated against the limits in the current
    /// snapshot before anything touches the network.
    pub fn cool_confirmed(&mut self, kelvin: f64) -> Result<Outcome> {
        let target = self.validate_temperature(kelvin)?;
        let frame = protocol::encode(CMD_COOL, target, target);
        let policy = self.policies.cool;
        self.run_confirmed("cool", frame, policy, |_| Ok(Precheck::Proceed), move |_, after| {
            let reported = named(after, PROP_TARGET_TEMP)?;
            Ok(
                if reported == target && run_mode_of(after)? == RunMode::Running {
                    Verdict::Met
                } else {
                    Verdict::NotMet
                },
            )
        })
    }

    /// Switch turbo mode and poll until the change is visible
    ///
    /// Success requires the (before, desired, after) triple to be one of
    /// the four consistent combinations over off/on. Raw values 2 and 3
    /// mean the device holds the setting itself; observing one before
    /// sending aborts with [`Outcome::DeviceOverride`] without spending the
    /// retry budget, and observing one afterwards ends the operation the
    /// same way.
    pub fn set_turbo_confirmed(&mut self, on: bool) -> Result<Outcome> {
        let desired = on as u16;
        let frame = protocol::encode(CMD_TURBO, desired, desired);
        let policy = self.policies.turbo;
        self.run_confirmed(
            "turbo",
            frame,
            policy,
            |before| {
                Ok(if turbo_device_owned(named(before, PROP_TURBO_MODE)?) {
                    Precheck::DeviceOwned
                } else {
                    Precheck::Proceed
                })
            },
            move |before, after| {
                let was = named(before, PROP_TURBO_MODE)?;
                let now = named(after, PROP_TURBO_MODE)?;
                if turbo_device_owned(now) {
                    return Ok(Verdict::DeviceOwned);
                }
                let met = matches!(
                    (was, desired, now),
                    (0, 0, 0) | (0, 1, 1) | (1, 0, 0) | (1, 1, 1)
                );
                Ok(if met { Verdict::Met } else { Verdict::NotMet })
            },
        )
    }

    /// Switch the autofill mode and poll until the change is visible
    ///
    /// Only [`AutofillMode::Manual`] and [`AutofillMode::Auto`] can be
    /// requested. A device already in Scheduled mode owns the setting and
    /// yields [`Outcome::DeviceOverride`] immediately.
    pub fn set_autofill_confirmed(&mut self, desired: AutofillMode) -> Result<Outcome> {
        let wire = autofill_wire_value(desired)?;
        let frame = protocol::encode(CMD_SET_AUTOFILL_MODE, wire, wire);
        let policy = self.policies.autofill;
        self.run_confirmed(
            "autofill",
            frame,
            policy,
            |before| {
                Ok(if autofill_of(before)? == AutofillMode::Scheduled {
                    Precheck::DeviceOwned
                } else {
                    Precheck::Proceed
                })
            },
            move |before, after| {
                use AutofillMode::{Auto, Manual};
                let was = autofill_of(before)?;
                let now = autofill_of(after)?;
                let met = matches!(
                    (was, desired, now),
                    (Manual, Manual, Manual)
                        | (Manual, Auto, Auto)
                        | (Auto, Manual, Manual)
                        | (Auto, Auto, Auto)
                );
                Ok(if met { Verdict::Met } else { Verdict::NotMet })
            },
        )
    }

    /// The confirmation loop shared by every confirmed operation
    ///
    /// Each attempt: precheck the snapshot the attempt starts from, send
    /// the frame, sleep out the settle delay, refresh, judge the
    /// (before, after) pair. At most `policy.max_attempts` frames are sent.
    fn run_confirmed<C, V>(
        &mut self,
        label: &str,
        frame: CommandFrame,
        policy: RetryPolicy,
        mut precheck: C,
        mut verdict: V,
    ) -> Result<Outcome>
    where
        C: FnMut(&StatusSnapshot) -> Result<Precheck>,
        V: FnMut(&StatusSnapshot, &StatusSnapshot) -> Result<Verdict>,
    {
        let mut attempts = 0;
        while attempts < policy.max_attempts {
            log::info!(
                "{}: attempt {} of {}",
                label,
                attempts + 1,
                policy.max_attempts
            );

            let before = self.snapshot.clone();
            if let Precheck::DeviceOwned = precheck(&before)? {
                log::warn!("{}: device holds this setting, not retrying", label);
                return Ok(Outcome::DeviceOverride);
            }

            self.transport.send_command(&frame, self.device_addr)?;
            thread::sleep(policy.settle_delay);
            self.refresh_status()?;
            attempts += 1;

            match verdict(&before, &self.snapshot)? {
                Verdict::Met => {
                    log::info!("{}: confirmed after {} attempt(s)", label, attempts);
                    return Ok(Outcome::Confirmed { attempts });
                }
                Verdict::DeviceOwned => {
                    log::warn!("{}: device took control of this setting", label);
                    return Ok(Outcome::DeviceOverride);
                }
                Verdict::NotMet => {}
            }
        }

        log::warn!(
            "{}: not confirmed after {} attempts",
            label,
            policy.max_attempts
        );
        Ok(Outcome::TimedOut { attempts })
    }

    fn validate_temperature(&self, kelvin: f64) -> Result<u16> {
        let centi = to_centikelvin(kelvin)?;
        let min = self.min_temperature()?;
        let max = self.max_temperature()?;
        if centi < min || centi > max {
            return Err(Error::OutOfRange {
                value: kelvin,
                min: min as f64 / CENTIKELVIN_PER_KELVIN,
                max: max as f64 / CENTIKELVIN_PER_KELVIN,
            });
        }
        Ok(centi)
    }

    // ========================================================================
    // Composite workflows
    // ========================================================================

    /// Confirmed Stop, then confirmed Restart
    pub fn shutdown_and_ready(&mut self) -> Result<WorkflowOutcome> {
        let stop = self.stop_confirmed()?;
        if !stop.is_confirmed() {
            return Ok(WorkflowOutcome::FailedAt {
                step: WorkflowStep::Stop,
                outcome: stop,
            });
        }
        let restart = self.restart_confirmed()?;
        if !restart.is_confirmed() {
            return Ok(WorkflowOutcome::FailedAt {
                step: WorkflowStep::Restart,
                outcome: restart,
            });
        }
        Ok(WorkflowOutcome::Completed)
    }

    /// Stop, restart and cool in sequence, each step gating the next
    ///
    /// Approximates an annealing cycle in software: the flow interruption
    /// lets the sample warm before cooling resumes toward `kelvin`.
    pub fn software_anneal(&mut self, kelvin: f64) -> Result<WorkflowOutcome> {
        let stop = self.stop_confirmed()?;
        if !stop.is_confirmed() {
            return Ok(WorkflowOutcome::FailedAt {
                step: WorkflowStep::Stop,
                outcome: stop,
            });
        }
        let restart = self.restart_confirmed()?;
        if !restart.is_confirmed() {
            return Ok(WorkflowOutcome::FailedAt {
                step: WorkflowStep::Restart,
                outcome: restart,
            });
        }
        let cool = self.cool_confirmed(kelvin)?;
        if !cool.is_confirmed() {
            return Ok(WorkflowOutcome::FailedAt {
                step: WorkflowStep::Cool,
                outcome: cool,
            });
        }
        Ok(WorkflowOutcome::Completed)
    }

    /// Validate, bring the device to Ready if needed, then cool to `kelvin`
    ///
    /// The restart step is skipped when the device is already Ready or
    /// Running. Validation failures return before any frame is sent.
    pub fn ready_set_temperature_and_go(&mut self, kelvin: f64) -> Result<WorkflowOutcome> {
        self.validate_temperature(kelvin)?;

        if !self.is_ready_or_running()? {
            log::info!("device not in Ready or Running mode, restarting first");
            let restart = self.restart_confirmed()?;
            if !restart.is_confirmed() {
                return Ok(WorkflowOutcome::FailedAt {
                    step: WorkflowStep::Restart,
                    outcome: restart,
                });
            }
        }

        let cool = self.cool_confirmed(kelvin)?;
        if !cool.is_confirmed() {
            return Ok(WorkflowOutcome::FailedAt {
                step: WorkflowStep::Cool,
                outcome: cool,
            });
        }
        Ok(WorkflowOutcome::Completed)
    }
}

// ============================================================================
// Snapshot helpers
// ============================================================================

fn named(snapshot: &StatusSnapshot, name: &'static str) -> Result<u16> {
    snapshot
        .get_named(name)
        .ok_or_else(|| Error::MissingProperty(name.to_string()))
}

fn run_mode_of(snapshot: &StatusSnapshot) -> Result<RunMode> {
    Ok(RunMode::from_raw(named(snapshot, PROP_RUN_MODE)?))
}

fn autofill_of(snapshot: &StatusSnapshot) -> Result<AutofillMode> {
    Ok(AutofillMode::from_raw(named(snapshot, PROP_AF_MODE)?))
}

fn autofill_wire_value(desired: AutofillMode) -> Result<u16> {
    match desired {
        AutofillMode::Manual => Ok(0),
        AutofillMode::Auto => Ok(1),
        other => Err(Error::InvalidParameter(format!(
            "autofill mode {} cannot be requested",
            other
        ))),
    }
}

fn to_centikelvin(kelvin: f64) -> Result<u16> {
    if !kelvin.is_finite() {
        return Err(Error::NotNumeric(kelvin.to_string()));
    }
    Ok((kelvin * CENTIKELVIN_PER_KELVIN).round() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode;
    use crate::transport::MockTransport;

    const MIN_TEMP: u16 = 1002;
    const MAX_TEMP: u16 = 1003;
    const RUN_MODE: u16 = 1053;
    const TARGET_TEMP: u16 = 1056;
    const TURBO: u16 = 1068;
    const AF_MODE: u16 = 1209;

    fn payload(entries: &[(u16, u16)]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(entries.len() * 4);
        for &(id, value) in entries {
            bytes.extend_from_slice(&id.to_be_bytes());
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes
    }

    fn addr() -> IpAddr {
        "10.0.0.5".parse().unwrap()
    }

    fn session(mock: &MockTransport) -> DeviceSession<MockTransport> {
        DeviceSession::with_policies(mock.clone(), addr(), Policies::immediate())
    }

    /// Push an initial payload and refresh so the session has a snapshot.
    fn primed_session(mock: &MockTransport, entries: &[(u16, u16)]) -> DeviceSession<MockTransport> {
        let mut s = session(mock);
        mock.push_status(payload(entries));
        s.refresh_status().unwrap();
        s
    }

    #[test]
    fn accessors_fail_before_first_refresh() {
        let mock = MockTransport::new();
        let s = session(&mock);
        assert!(matches!(s.run_mode(), Err(Error::MissingProperty(_))));
        assert!(matches!(
            s.sample_temperature(),
            Err(Error::MissingProperty(_))
        ));
    }

    #[test]
    fn refresh_replaces_snapshot_wholesale() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(RUN_MODE, 2), (TURBO, 1)]);
        assert_eq!(s.run_mode().unwrap(), RunMode::Ready);
        assert_eq!(s.turbo_mode().unwrap(), 1);

        mock.push_status(payload(&[(RUN_MODE, 3)]));
        s.refresh_status().unwrap();
        assert_eq!(s.run_mode().unwrap(), RunMode::Running);
        // Turbo was not in the second broadcast, so it is gone, not stale
        assert!(matches!(s.turbo_mode(), Err(Error::MissingProperty(_))));
    }

    #[test]
    fn restart_confirms_on_the_attempt_that_sees_ready() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        // Device needs three attempts to come back up
        mock.push_status(payload(&[(RUN_MODE, 0)]));
        mock.push_status(payload(&[(RUN_MODE, 0)]));
        mock.push_status(payload(&[(RUN_MODE, 2)]));

        let outcome = s.restart_confirmed().unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 3 });
        assert_eq!(mock.sent_count(), 3);
        for (frame, target) in mock.sent() {
            assert_eq!(frame, encode(CMD_RESTART, 0, 0));
            assert_eq!(target, addr());
        }
    }

    #[test]
    fn stop_times_out_after_exactly_the_budget() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        // Device never shuts down; sticky last payload keeps reporting Running
        mock.push_status(payload(&[(RUN_MODE, 3)]));

        let outcome = s.stop_confirmed().unwrap();
        assert_eq!(outcome, Outcome::TimedOut { attempts: 10 });
        assert_eq!(mock.sent_count(), 10);
        assert!(mock.sent().iter().all(|(f, _)| f.code() == CMD_STOP));
    }

    #[test]
    fn cool_confirms_when_target_echoed_and_running() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 6000), (MAX_TEMP, 40000), (RUN_MODE, 2)]);
        mock.push_status(payload(&[(TARGET_TEMP, 8000), (RUN_MODE, 3)]));

        let outcome = s.cool_confirmed(80.0).unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 1 });
        assert_eq!(mock.sent(), vec![(encode(CMD_COOL, 8000, 8000), addr())]);
    }

    #[test]
    fn cool_retries_until_device_echoes_target() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 6000), (MAX_TEMP, 40000), (RUN_MODE, 3)]);
        // First refresh still shows the old target, second shows the new one
        mock.push_status(payload(&[(TARGET_TEMP, 10000), (RUN_MODE, 3)]));
        mock.push_status(payload(&[(TARGET_TEMP, 8000), (RUN_MODE, 3)]));

        let outcome = s.cool_confirmed(80.0).unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 2 });
        assert_eq!(mock.sent_count(), 2);
    }

    #[test]
    fn cool_out_of_range_sends_nothing() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 8000), (MAX_TEMP, 40000)]);

        let result = s.cool_confirmed(1.0);
        assert!(matches!(result, Err(Error::OutOfRange { .. })));
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn cool_without_limits_in_snapshot_sends_nothing() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        let result = s.cool_confirmed(80.0);
        assert!(matches!(result, Err(Error::MissingProperty(_))));
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn turbo_sentinel_before_send_is_device_override() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(TURBO, 2)]);

        let outcome = s.set_turbo_confirmed(true).unwrap();
        assert_eq!(outcome, Outcome::DeviceOverride);
        // Aborted before any frame went out
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn turbo_sentinel_after_send_is_device_override() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(TURBO, 0)]);
        mock.push_status(payload(&[(TURBO, 3)]));

        let outcome = s.set_turbo_confirmed(true).unwrap();
        assert_eq!(outcome, Outcome::DeviceOverride);
        assert_eq!(mock.sent_count(), 1);
    }

    #[test]
    fn turbo_confirms_on_visible_flip() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(TURBO, 0)]);
        mock.push_status(payload(&[(TURBO, 1)]));

        let outcome = s.set_turbo_confirmed(true).unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 1 });
        assert_eq!(mock.sent(), vec![(encode(CMD_TURBO, 1, 1), addr())]);
    }

    #[test]
    fn turbo_retries_while_flip_not_visible() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(TURBO, 0)]);
        // Broadcast still shows the old state once before the flip lands
        mock.push_status(payload(&[(TURBO, 0)]));
        mock.push_status(payload(&[(TURBO, 1)]));

        let outcome = s.set_turbo_confirmed(true).unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 2 });
        assert_eq!(mock.sent_count(), 2);
    }

    #[test]
    fn turbo_off_when_already_off_confirms() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(TURBO, 0)]);
        mock.push_status(payload(&[(TURBO, 0)]));

        let outcome = s.set_turbo_confirmed(false).unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 1 });
    }

    #[test]
    fn autofill_scheduled_is_device_override() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(AF_MODE, 2)]);

        let outcome = s.set_autofill_confirmed(AutofillMode::Auto).unwrap();
        assert_eq!(outcome, Outcome::DeviceOverride);
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn autofill_confirms_manual_to_auto() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(AF_MODE, 0)]);
        mock.push_status(payload(&[(AF_MODE, 1)]));

        let outcome = s.set_autofill_confirmed(AutofillMode::Auto).unwrap();
        assert_eq!(outcome, Outcome::Confirmed { attempts: 1 });
        assert_eq!(
            mock.sent(),
            vec![(encode(CMD_SET_AUTOFILL_MODE, 1, 1), addr())]
        );
    }

    #[test]
    fn autofill_rejects_unrequestable_modes() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(AF_MODE, 0)]);

        let result = s.set_autofill_confirmed(AutofillMode::Scheduled);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn shutdown_and_ready_stops_then_restarts() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        mock.push_status(payload(&[(RUN_MODE, 5)])); // stop lands
        mock.push_status(payload(&[(RUN_MODE, 2)])); // restart lands

        let outcome = s.shutdown_and_ready().unwrap();
        assert_eq!(outcome, WorkflowOutcome::Completed);
        let codes: Vec<u16> = mock.sent().iter().map(|(f, _)| f.code()).collect();
        assert_eq!(codes, vec![CMD_STOP, CMD_RESTART]);
    }

    #[test]
    fn shutdown_and_ready_reports_failed_stop() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        // Device refuses to shut down
        mock.push_status(payload(&[(RUN_MODE, 3)]));

        let outcome = s.shutdown_and_ready().unwrap();
        assert_eq!(
            outcome,
            WorkflowOutcome::FailedAt {
                step: WorkflowStep::Stop,
                outcome: Outcome::TimedOut { attempts: 10 },
            }
        );
        // Restart was never attempted
        assert!(mock.sent().iter().all(|(f, _)| f.code() == CMD_STOP));
    }

    #[test]
    fn software_anneal_runs_all_three_steps() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 6000), (MAX_TEMP, 40000), (RUN_MODE, 3)]);
        mock.push_status(payload(&[(RUN_MODE, 5)]));
        mock.push_status(payload(&[(RUN_MODE, 2), (MIN_TEMP, 6000), (MAX_TEMP, 40000)]));
        mock.push_status(payload(&[(TARGET_TEMP, 10000), (RUN_MODE, 3)]));

        let outcome = s.software_anneal(100.0).unwrap();
        assert_eq!(outcome, WorkflowOutcome::Completed);
        let codes: Vec<u16> = mock.sent().iter().map(|(f, _)| f.code()).collect();
        assert_eq!(codes, vec![CMD_STOP, CMD_RESTART, CMD_COOL]);
    }

    #[test]
    fn software_anneal_stops_at_failed_restart() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 6000), (MAX_TEMP, 40000), (RUN_MODE, 3)]);
        mock.push_status(payload(&[(RUN_MODE, 5)])); // stop lands, then sticks
        let outcome = s.software_anneal(100.0).unwrap();
        assert_eq!(
            outcome,
            WorkflowOutcome::FailedAt {
                step: WorkflowStep::Restart,
                outcome: Outcome::TimedOut { attempts: 10 },
            }
        );
        let codes: Vec<u16> = mock.sent().iter().map(|(f, _)| f.code()).collect();
        assert_eq!(codes[0], CMD_STOP);
        assert_eq!(codes.len(), 11); // 1 stop + 10 restart attempts
        assert!(!codes.contains(&CMD_COOL));
    }

    #[test]
    fn ready_set_and_go_skips_restart_when_running() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 6000), (MAX_TEMP, 40000), (RUN_MODE, 3)]);
        mock.push_status(payload(&[(TARGET_TEMP, 8000), (RUN_MODE, 3)]));

        let outcome = s.ready_set_temperature_and_go(80.0).unwrap();
        assert_eq!(outcome, WorkflowOutcome::Completed);
        let codes: Vec<u16> = mock.sent().iter().map(|(f, _)| f.code()).collect();
        assert_eq!(codes, vec![CMD_COOL]);
    }

    #[test]
    fn ready_set_and_go_restarts_a_shutdown_device_first() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 6000), (MAX_TEMP, 40000), (RUN_MODE, 5)]);
        mock.push_status(payload(&[(RUN_MODE, 2), (MIN_TEMP, 6000), (MAX_TEMP, 40000)]));
        mock.push_status(payload(&[(TARGET_TEMP, 8000), (RUN_MODE, 3)]));

        let outcome = s.ready_set_temperature_and_go(80.0).unwrap();
        assert_eq!(outcome, WorkflowOutcome::Completed);
        let codes: Vec<u16> = mock.sent().iter().map(|(f, _)| f.code()).collect();
        assert_eq!(codes, vec![CMD_RESTART, CMD_COOL]);
    }

    #[test]
    fn ready_set_and_go_validates_before_any_traffic() {
        let mock = MockTransport::new();
        let mut s = primed_session(&mock, &[(MIN_TEMP, 8000), (MAX_TEMP, 40000), (RUN_MODE, 5)]);

        let result = s.ready_set_temperature_and_go(1000.0);
        assert!(matches!(result, Err(Error::OutOfRange { .. })));
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn fire_and_forget_commands_send_one_frame() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        s.hold().unwrap();
        s.end(360).unwrap();
        assert_eq!(
            mock.sent(),
            vec![
                (encode(CMD_HOLD, 0, 0), addr()),
                (encode(CMD_END, 360, 360), addr()),
            ]
        );
    }

    #[test]
    fn send_named_uses_the_command_catalog() {
        let mock = MockTransport::new();
        let mut s = session(&mock);
        s.send_named("Purge", 0, 0).unwrap();
        assert_eq!(mock.sent()[0].0.code(), 16);

        let result = s.send_named("Warp drive", 0, 0);
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
    }
}
