//! Top-level state machine over the selected modes.
//!
//! ```text
//! Running --recoverable auth error--> Restarting --delay--> Running
//! Running --any other error--> Failed
//! Running --stop signal--> Stopped
//! ```

use crate::gate::EligibilityGate;
use crate::patterns::PatternLibrary;
use crate::processor::StreamProcessor;
use crate::responder::Responder;
use crate::response::ResponseTemplate;
use crate::sweeper::CleanupSweeper;
use crate::LoopEnd;
use bot_core::{
    BotConfig, CleanupConfig, ConfigError, Connector, CoreError, ErrorExt, ErrorRecovery,
    EventKind, Mode, Platform, RecoveryStrategy,
};
use reply_ledger::ReplyLedger;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Run in this order, each until it ends.
    pub modes: Vec<Mode>,
    pub dry_run: bool,
    pub max_replies_per_thread: u32,
    pub cooldown: Duration,
    pub restart_delay: Duration,
    pub cleanup: CleanupConfig,
}

impl SupervisorSettings {
    pub fn from_config(config: &BotConfig, modes: Vec<Mode>) -> Self {
        Self {
            modes,
            dry_run: config.behavior.dry_run,
            max_replies_per_thread: config.behavior.max_replies_per_thread,
            cooldown: config.behavior.cooldown(),
            restart_delay: config.behavior.restart_delay(),
            cleanup: config.cleanup.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Restarting { delay: Duration },
}

/// How a supervised run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    /// The stop signal arrived.
    Stopped,
    /// Every selected mode ran out of events.
    Exhausted,
}

impl SupervisorOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorOutcome::Stopped => 0,
            SupervisorOutcome::Exhausted => 1,
        }
    }
}

pub struct Supervisor<C, L> {
    connector: C,
    ledger: L,
    patterns: PatternLibrary,
    template: ResponseTemplate,
    settings: SupervisorSettings,
    restarts: u32,
}

impl<C, L> Supervisor<C, L>
where
    C: Connector,
    L: ReplyLedger,
{
    pub fn new(
        connector: C,
        ledger: L,
        patterns: PatternLibrary,
        template: ResponseTemplate,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            connector,
            ledger,
            patterns,
            template,
            settings,
            restarts: 0,
        }
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<SupervisorOutcome, CoreError> {
        if self.settings.modes.is_empty() {
            error!("No action specified");
            return Err(ConfigError::NoModeSelected.into());
        }

        let mut state = SupervisorState::Running;
        loop {
            state = match state {
                SupervisorState::Running => match self.run_modes(cancel).await {
                    Ok(LoopEnd::Stopped) => return Ok(SupervisorOutcome::Stopped),
                    Ok(LoopEnd::Exhausted) => {
                        warn!("All selected modes ended; no action left to perform");
                        return Ok(SupervisorOutcome::Exhausted);
                    }
                    Err(e) => {
                        match ErrorRecovery::determine_strategy(&e, self.settings.restart_delay) {
                            RecoveryStrategy::RestartLoop { delay } => {
                                e.log_warn();
                                warn!("Restarting loop due to {} error", e.error_code());
                                SupervisorState::Restarting { delay }
                            }
                            RecoveryStrategy::Fail => {
                                e.log_error();
                                return Err(e);
                            }
                        }
                    }
                },
                SupervisorState::Restarting { delay } => {
                    self.restarts += 1;
                    let interrupted = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(delay) => false,
                    };
                    if interrupted {
                        return Ok(SupervisorOutcome::Stopped);
                    }
                    SupervisorState::Running
                }
            };
        }
    }

    /// One pass over the mode selection on a fresh session.
    async fn run_modes(&self, cancel: &CancellationToken) -> Result<LoopEnd, CoreError> {
        let platform = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            platform = self.connector.connect() => Some(platform),
        };
        let Some(platform) = platform else {
            return Ok(LoopEnd::Stopped);
        };
        let platform = platform?;

        for mode in &self.settings.modes {
            info!("Starting {} loop", mode);
            let end = match mode {
                Mode::Comments => self.process_stream(&platform, EventKind::Comment, cancel).await?,
                Mode::Submissions => {
                    self.process_stream(&platform, EventKind::Submission, cancel)
                        .await?
                }
                Mode::Cleanup => {
                    CleanupSweeper::new(
                        &platform,
                        self.settings.cleanup.clone(),
                        self.settings.dry_run,
                    )
                    .run(cancel)
                    .await?
                }
            };

            if end == LoopEnd::Stopped {
                return Ok(LoopEnd::Stopped);
            }
        }

        Ok(LoopEnd::Exhausted)
    }

    async fn process_stream(
        &self,
        platform: &C::Platform,
        kind: EventKind,
        cancel: &CancellationToken,
    ) -> Result<LoopEnd, CoreError> {
        let gate = EligibilityGate::new(
            &self.patterns,
            platform,
            &self.ledger,
            self.settings.max_replies_per_thread,
        );
        let responder = Responder::new(
            platform,
            &self.ledger,
            &self.template,
            self.settings.dry_run,
        );

        StreamProcessor::new(
            kind,
            platform.stream(kind),
            gate,
            responder,
            self.settings.cooldown,
        )
        .run(cancel)
        .await
    }
}
