//! Seams between the response engine and the platform it talks to.
//!
//! The Reddit client implements all of these; tests substitute in-memory
//! fakes.

#![allow(async_fn_in_trait)]

use crate::{CoreError, Event, EventKind, PostedReply};

/// Live, ordered sequence of events. `Ok(None)` means the source is closed,
/// which only finite sources (replays, tests) ever report.
pub trait EventSource {
    async fn next_event(&mut self) -> Result<Option<Event>, CoreError>;
}

/// Read access to the replies already present under an event.
pub trait ThreadReplies {
    /// Authors of every reply below `event`: the whole reply tree of a
    /// comment, or every comment of a submission.
    async fn reply_authors(&self, event: &Event) -> Result<Vec<String>, CoreError>;
}

/// Mutating actions the bot performs on the platform.
pub trait Publisher {
    /// Posts `text` as a reply to `event` and returns the new reply's fullname.
    async fn reply(&self, event: &Event, text: &str) -> Result<String, CoreError>;
    async fn upvote(&self, fullname: &str) -> Result<(), CoreError>;
    async fn retract(&self, fullname: &str) -> Result<(), CoreError>;
}

/// The bot's own identity on the platform.
pub trait Identity {
    fn username(&self) -> &str;
    /// Newest-first page of the bot's own comments.
    async fn recent_replies(&self, limit: u32) -> Result<Vec<PostedReply>, CoreError>;
}

/// A logged-in session: everything the mode loops need from the platform.
pub trait Platform: ThreadReplies + Publisher + Identity {
    type Stream<'a>: EventSource
    where
        Self: 'a;

    /// Opens a fresh stream of new comments or submissions.
    fn stream(&self, kind: EventKind) -> Self::Stream<'_>;
}

/// Produces new sessions. The supervisor connects again after every
/// recoverable authorization failure.
pub trait Connector {
    type Platform: Platform;

    async fn connect(&self) -> Result<Self::Platform, CoreError>;
}
