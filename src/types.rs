//! Core types for device state and confirmed operations

use std::fmt;
use std::time::Duration;

/// Device run mode, decoded from property 1053
///
/// Transitions are driven entirely by firmware; this side only requests
/// them and observes the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Initializing,
    InitializationFailed,
    Ready,
    Running,
    SetupMode,
    ShutdownNoError,
    ShutdownWithError,
    Unknown,
}

impl RunMode {
    /// Decode the raw property value
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => RunMode::Initializing,
            1 => RunMode::InitializationFailed,
            2 => RunMode::Ready,
            3 => RunMode::Running,
            4 => RunMode::SetupMode,
            5 => RunMode::ShutdownNoError,
            6 => RunMode::ShutdownWithError,
            _ => RunMode::Unknown,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunMode::Initializing => "Initializing",
            RunMode::InitializationFailed => "Initialization Failed",
            RunMode::Ready => "Ready",
            RunMode::Running => "Running",
            RunMode::SetupMode => "Set up Mode",
            RunMode::ShutdownNoError => "Shut down without error",
            RunMode::ShutdownWithError => "Shut down with error",
            RunMode::Unknown => "Unknown mode",
        };
        f.write_str(label)
    }
}

/// Autofill controller mode, decoded from property 1209
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutofillMode {
    /// Operator-triggered refills
    Manual,
    /// Level-triggered refills
    Auto,
    /// Device-scheduled refills; the device owns the setting
    Scheduled,
    Unknown,
}

impl AutofillMode {
    /// Decode the raw property value
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => AutofillMode::Manual,
            1 => AutofillMode::Auto,
            2 => AutofillMode::Scheduled,
            _ => AutofillMode::Unknown,
        }
    }
}

impl fmt::Display for AutofillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AutofillMode::Manual => "Manual",
            AutofillMode::Auto => "Auto",
            AutofillMode::Scheduled => "Scheduled",
            AutofillMode::Unknown => "Unknown mode",
        };
        f.write_str(label)
    }
}

/// Raw turbo values 2 and 3 mean turbo is on with the device holding the
/// setting itself
pub fn turbo_device_owned(raw: u16) -> bool {
    raw == 2 || raw == 3
}

/// Display label for a raw turbo value
pub fn turbo_label(raw: u16) -> &'static str {
    match raw {
        0 => "Off",
        1 => "On",
        _ => "On (Automatic)",
    }
}

/// How a confirmed operation ended
///
/// These are ordinary return values, not errors: whether the device
/// reached the requested state is the result the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Requested state observed after this many send/refresh cycles
    Confirmed {
        /// Cycles used, 1-based
        attempts: u32,
    },
    /// Retry budget exhausted; exactly `attempts` frames were sent
    TimedOut {
        /// Cycles used (equals the budget)
        attempts: u32,
    },
    /// The device itself currently owns the setting; retrying is pointless
    DeviceOverride,
}

impl Outcome {
    /// True when the device reached the requested state
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed { .. })
    }
}

/// Steps of a composite workflow, for failure reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Stop,
    Restart,
    Cool,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStep::Stop => "Stop",
            WorkflowStep::Restart => "Restart",
            WorkflowStep::Cool => "Cool",
        };
        f.write_str(label)
    }
}

/// Result of a composite workflow
///
/// Workflows stop at the first step that does not confirm and report
/// which one it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Every step confirmed
    Completed,
    /// A step failed; later steps were not attempted
    FailedAt {
        /// The step that did not confirm
        step: WorkflowStep,
        /// How it ended
        outcome: Outcome,
    },
}

impl WorkflowOutcome {
    /// True when every step confirmed
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed)
    }
}

/// Retry budget and settle time for one confirmed operation
///
/// The settle delay is chosen per operation to exceed the one-second
/// broadcast interval, so the refresh that follows reflects the command's
/// effect rather than a packet already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum send/refresh cycles before giving up
    pub max_attempts: u32,
    /// Sleep between sending the frame and refreshing status
    pub settle_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub const fn new(max_attempts: u32, settle_delay: Duration) -> Self {
        Self {
            max_attempts,
            settle_delay,
        }
    }
}

/// Per-operation retry policies
///
/// The defaults are the operational constants; [`Policies::immediate`]
/// keeps the budgets but drops the delays, for driving the engine with a
/// scripted transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policies {
    pub restart: RetryPolicy,
    pub stop: RetryPolicy,
    pub cool: RetryPolicy,
    pub turbo: RetryPolicy,
    pub autofill: RetryPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            // Restart takes the device through re-initialization, hence
            // the longest settle time.
            restart: RetryPolicy::new(10, Duration::from_secs(4)),
            stop: RetryPolicy::new(10, Duration::from_secs(1)),
            cool: RetryPolicy::new(10, Duration::from_secs(1)),
            turbo: RetryPolicy::new(10, Duration::from_secs(3)),
            autofill: RetryPolicy::new(10, Duration::from_secs(4)),
        }
    }
}

impl Policies {
    /// Default budgets with zero settle delay
    pub fn immediate() -> Self {
        let mut policies = Self::default();
        policies.restart.settle_delay = Duration::ZERO;
        policies.stop.settle_delay = Duration::ZERO;
        policies.cool.settle_delay = Duration::ZERO;
        policies.turbo.settle_delay = Duration::ZERO;
        policies.autofill.settle_delay = Duration::ZERO;
        policies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_decoding() {
        assert_eq!(RunMode::from_raw(2), RunMode::Ready);
        assert_eq!(RunMode::from_raw(3), RunMode::Running);
        assert_eq!(RunMode::from_raw(5), RunMode::ShutdownNoError);
        assert_eq!(RunMode::from_raw(6), RunMode::ShutdownWithError);
        assert_eq!(RunMode::from_raw(7), RunMode::Unknown);
        assert_eq!(RunMode::from_raw(u16::MAX), RunMode::Unknown);
    }

    #[test]
    fn autofill_mode_decoding() {
        assert_eq!(AutofillMode::from_raw(0), AutofillMode::Manual);
        assert_eq!(AutofillMode::from_raw(1), AutofillMode::Auto);
        assert_eq!(AutofillMode::from_raw(2), AutofillMode::Scheduled);
        assert_eq!(AutofillMode::from_raw(3), AutofillMode::Unknown);
    }

    #[test]
    fn turbo_sentinels() {
        assert!(!turbo_device_owned(0));
        assert!(!turbo_device_owned(1));
        assert!(turbo_device_owned(2));
        assert!(turbo_device_owned(3));
        assert_eq!(turbo_label(1), "On");
        assert_eq!(turbo_label(2), "On (Automatic)");
    }

    #[test]
    fn immediate_policies_keep_budgets() {
        let policies = Policies::immediate();
        assert_eq!(policies.restart.max_attempts, 10);
        assert_eq!(policies.turbo.settle_delay, Duration::ZERO);
    }
}
