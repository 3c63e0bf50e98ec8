use crate::patterns::PatternLibrary;
use bot_core::{CoreError, Event, Identity, ThreadReplies};
use reply_ledger::ReplyLedger;
use std::fmt;
use tracing::{debug, info};

/// Outcome of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Eligible,
    NoTrigger,
    Suppressed,
    AlreadyReplied,
    ThreadLimitReached { replies: u32 },
}

impl Decision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Decision::Eligible)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Eligible => write!(f, "eligible"),
            Decision::NoTrigger => write!(f, "no trigger"),
            Decision::Suppressed => write!(f, "suppressed"),
            Decision::AlreadyReplied => write!(f, "already replied"),
            Decision::ThreadLimitReached { replies } => {
                write!(f, "thread limit reached ({} replies)", replies)
            }
        }
    }
}

/// Decides whether an event deserves a reply. Never mutates anything.
///
/// Pattern checks run first; the platform and the ledger are only consulted
/// for events that already matched a trigger.
pub struct EligibilityGate<'a, P, L> {
    patterns: &'a PatternLibrary,
    platform: &'a P,
    ledger: &'a L,
    max_replies_per_thread: u32,
}

impl<'a, P, L> EligibilityGate<'a, P, L>
where
    P: ThreadReplies + Identity,
    L: ReplyLedger,
{
    pub fn new(
        patterns: &'a PatternLibrary,
        platform: &'a P,
        ledger: &'a L,
        max_replies_per_thread: u32,
    ) -> Self {
        Self {
            patterns,
            platform,
            ledger,
            max_replies_per_thread,
        }
    }

    pub async fn should_respond(
        &self,
        event: &Event,
        combined_text: &str,
        context_text: &str,
    ) -> Result<Decision, CoreError> {
        if !self.patterns.matches_trigger(combined_text) {
            return Ok(Decision::NoTrigger);
        }

        if self.patterns.matches_suppression(context_text) {
            info!(
                "Ignoring {} {} due to suppression list",
                event.kind().singular(),
                event.permalink()
            );
            return Ok(Decision::Suppressed);
        }

        let me = self.platform.username();
        let authors = self.platform.reply_authors(event).await?;
        if authors.iter().any(|author| author.eq_ignore_ascii_case(me)) {
            info!("Already replied under {}", event.permalink());
            return Ok(Decision::AlreadyReplied);
        }

        let replies = self.ledger.get(event.thread_id()).await?;
        if replies >= self.max_replies_per_thread {
            info!(
                "Already replied {} times in thread {}; skipping",
                replies,
                event.thread_id()
            );
            return Ok(Decision::ThreadLimitReached { replies });
        }

        debug!("Event {} is eligible", event.id());
        Ok(Decision::Eligible)
    }
}
