//! Error recovery strategies for the top-level mode loops.
//!
//! Only one class of failure is survivable at the loop level: the platform
//! rejecting the bot's authorization. Everything else ends the process and is
//! left to the external process supervisor.

use crate::{CoreError, ErrorExt};
use std::time::Duration;

/// What the supervisor should do with an error that escaped a mode loop
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    /// Log, wait `delay`, then start the whole mode selection again with a
    /// fresh platform session
    RestartLoop { delay: Duration },
    /// Propagate the error and terminate
    Fail,
}

/// Error recovery handler that maps errors onto supervisor strategies
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Determine the appropriate recovery strategy for a given error
    pub fn determine_strategy(error: &CoreError, restart_delay: Duration) -> RecoveryStrategy {
        if error.is_recoverable_auth() {
            RecoveryStrategy::RestartLoop {
                delay: restart_delay,
            }
        } else {
            RecoveryStrategy::Fail
        }
    }
}
