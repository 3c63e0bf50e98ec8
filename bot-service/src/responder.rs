use crate::response::ResponseTemplate;
use bot_core::{CoreError, Event, Publisher};
use reply_ledger::ReplyLedger;
use tracing::info;

/// Posts the response document under eligible events.
pub struct Responder<'a, P, L> {
    platform: &'a P,
    ledger: &'a L,
    template: &'a ResponseTemplate,
    dry_run: bool,
}

impl<'a, P, L> Responder<'a, P, L>
where
    P: Publisher,
    L: ReplyLedger,
{
    pub fn new(
        platform: &'a P,
        ledger: &'a L,
        template: &'a ResponseTemplate,
        dry_run: bool,
    ) -> Self {
        Self {
            platform,
            ledger,
            template,
            dry_run,
        }
    }

    /// Returns true when a reply was actually posted. The event replied to
    /// gets the upvote.
    ///
    /// The thread counter is bumped before posting and never rolled back: a
    /// failed post costs the thread its reply rather than risking a second one.
    pub async fn respond(&self, event: &Event) -> Result<bool, CoreError> {
        if self.dry_run {
            info!("Dry-run, skipping {} {}", event.kind().singular(), event.permalink());
            return Ok(false);
        }

        let thread_id = event.thread_id();
        let replies = self.ledger.increment(thread_id).await?;
        info!(
            "Replying to {} {} (reply {} in thread {})",
            event.kind().singular(),
            event.permalink(),
            replies,
            thread_id
        );

        let reply = self
            .platform
            .reply(event, &self.template.render(thread_id))
            .await?;
        self.platform.upvote(&event.fullname()).await?;

        info!("Posted reply {}", reply);
        Ok(true)
    }
}
