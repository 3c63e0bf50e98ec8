use crate::LoopEnd;
use bot_core::{CleanupConfig, CoreError, Identity, Publisher};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Running count is logged every this many checked replies.
const PROGRESS_EVERY: u64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    /// Fullnames scoring below the threshold.
    pub flagged: Vec<String>,
    /// How many of `flagged` were actually retracted; zero in dry-run.
    pub retracted: usize,
}

/// Periodically retracts the bot's own replies the community voted down.
pub struct CleanupSweeper<'a, P> {
    platform: &'a P,
    config: CleanupConfig,
    dry_run: bool,
    checked_total: u64,
}

impl<'a, P> CleanupSweeper<'a, P>
where
    P: Identity + Publisher,
{
    pub fn new(platform: &'a P, config: CleanupConfig, dry_run: bool) -> Self {
        Self {
            platform,
            config,
            dry_run,
            checked_total: 0,
        }
    }

    pub fn checked_total(&self) -> u64 {
        self.checked_total
    }

    pub async fn sweep_once(&mut self) -> Result<SweepReport, CoreError> {
        let replies = self.platform.recent_replies(self.config.batch_size).await?;
        let mut report = SweepReport::default();

        for reply in replies {
            self.checked_total += 1;
            report.checked += 1;

            if reply.score < self.config.min_score {
                if self.dry_run {
                    info!(
                        "Dry-run, not deleting {} with low score {}",
                        reply.permalink, reply.score
                    );
                } else {
                    info!("Deleting comment {} with low score {}", reply.permalink, reply.score);
                    self.platform.retract(&reply.fullname).await?;
                    report.retracted += 1;
                }
                report.flagged.push(reply.fullname);
            }

            if self.checked_total % PROGRESS_EVERY == 0 {
                info!("Checked {} comments", self.checked_total);
            }
        }

        Ok(report)
    }

    /// Sweeps, then waits out the interval, until cancelled or an error
    /// escapes.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopEnd, CoreError> {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let report = self.sweep_once().await?;
            info!(
                "Cleanup pass checked {}, retracted {}; next pass in {:?}",
                report.checked,
                report.retracted,
                self.config.interval()
            );

            let interrupted = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(self.config.interval()) => false,
            };
            if interrupted {
                break;
            }
        }

        info!("Checked {} comments; quitting...", self.checked_total);
        Ok(LoopEnd::Stopped)
    }
}
