use crate::gate::EligibilityGate;
use crate::responder::Responder;
use crate::LoopEnd;
use bot_core::{CoreError, Event, EventKind, EventSource, Identity, Publisher, ThreadReplies};
use reply_ledger::ReplyLedger;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How often the running counters are logged: every `dense_interval`
/// events until `dense_until` events were checked, then every
/// `sparse_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSchedule {
    pub dense_interval: u64,
    pub dense_until: u64,
    pub sparse_interval: u64,
}

impl ProgressSchedule {
    pub fn for_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::Comment => Self {
                dense_interval: 100,
                dense_until: 10_000,
                sparse_interval: 10_000,
            },
            EventKind::Submission => Self {
                dense_interval: 100,
                dense_until: 1_000,
                sparse_interval: 1_000,
            },
        }
    }

    pub fn is_due(&self, checked: u64) -> bool {
        let interval = if checked < self.dense_until {
            self.dense_interval
        } else {
            self.sparse_interval
        };
        interval > 0 && checked % interval == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub checked: u64,
    pub responded_to: u64,
}

/// Consumes one event stream: evaluate, maybe reply, cool down, repeat.
pub struct StreamProcessor<'a, S, P, L> {
    kind: EventKind,
    source: S,
    gate: EligibilityGate<'a, P, L>,
    responder: Responder<'a, P, L>,
    schedule: ProgressSchedule,
    cooldown: Duration,
    stats: ProcessorStats,
}

impl<'a, S, P, L> StreamProcessor<'a, S, P, L>
where
    S: EventSource,
    P: ThreadReplies + Publisher + Identity,
    L: ReplyLedger,
{
    pub fn new(
        kind: EventKind,
        source: S,
        gate: EligibilityGate<'a, P, L>,
        responder: Responder<'a, P, L>,
        cooldown: Duration,
    ) -> Self {
        Self {
            kind,
            source,
            gate,
            responder,
            schedule: ProgressSchedule::for_kind(kind),
            cooldown,
            stats: ProcessorStats::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: ProgressSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    /// Runs until the token is cancelled, the source closes, or an error
    /// escapes.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopEnd, CoreError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = self.source.next_event() => Some(next),
            };

            let Some(next) = next else {
                return Ok(self.stop());
            };
            let Some(event) = next? else {
                info!(
                    "{} stream closed after {} checked",
                    self.kind.singular(),
                    self.stats.checked
                );
                return Ok(LoopEnd::Exhausted);
            };

            let responded = self.process(&event).await?;
            if responded {
                info!("Sleeping {:?} to avoid commenting too much", self.cooldown);
                let interrupted = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(self.cooldown) => false,
                };
                if interrupted {
                    return Ok(self.stop());
                }
            }
        }
    }

    /// Evaluates a single event and replies when it is eligible. Returns
    /// whether a reply was posted.
    pub async fn process(&mut self, event: &Event) -> Result<bool, CoreError> {
        let combined_text = event.combined_text();
        let context_text = event.context_text();

        let decision = self
            .gate
            .should_respond(event, &combined_text, &context_text)
            .await?;
        debug!("{} {}: {}", self.kind.singular(), event.id(), decision);

        let responded = decision.is_eligible() && self.responder.respond(event).await?;
        if responded {
            self.stats.responded_to += 1;
        }

        self.stats.checked += 1;
        if self.schedule.is_due(self.stats.checked) {
            info!(
                "Checked {} {}, replied to {}",
                self.stats.checked, self.kind, self.stats.responded_to
            );
        }

        Ok(responded)
    }

    fn stop(&self) -> LoopEnd {
        info!(
            "Checked {} {}, replied to {}; quitting...",
            self.stats.checked, self.kind, self.stats.responded_to
        );
        LoopEnd::Stopped
    }
}
