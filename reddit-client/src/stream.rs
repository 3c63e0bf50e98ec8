use crate::client::RedditClient;
use bot_core::{CoreError, Event, EventKind, EventSource};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, trace};

/// Ids remembered to drop items that show up again on the next poll.
pub const SEEN_CAPACITY: usize = 301;
/// Items requested per listing poll.
pub const POLL_LIMIT: u32 = 100;
/// Longest pause between polls that returned nothing new, in seconds.
pub const MAX_POLL_DELAY_SECS: u64 = 16;

/// Insertion-ordered set that forgets its oldest entry when full.
#[derive(Debug)]
pub struct BoundedSet {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl BoundedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Returns false if `id` was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }

        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Doubling delay between empty polls, with a little jitter.
#[derive(Debug)]
pub struct ExponentialCounter {
    base: f64,
    max: f64,
}

impl ExponentialCounter {
    pub fn new(max_secs: u64) -> Self {
        Self {
            base: 1.0,
            max: max_secs as f64,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let max_jitter = self.base / 16.0;
        let value = self.base + fastrand::f64() * max_jitter - max_jitter / 2.0;
        self.base = (self.base * 2.0).min(self.max);
        Duration::from_secs_f64(value)
    }

    pub fn reset(&mut self) {
        self.base = 1.0;
    }
}

/// Polls a subreddit's newest comments or submissions and hands them out
/// one at a time, oldest first, each at most once.
#[derive(Debug)]
pub struct RedditStream<'a> {
    client: &'a RedditClient,
    kind: EventKind,
    subreddit: String,
    buffer: VecDeque<Event>,
    seen: BoundedSet,
    backoff: ExponentialCounter,
    skip_existing: bool,
    first_poll: bool,
}

impl<'a> RedditStream<'a> {
    pub fn new(
        client: &'a RedditClient,
        kind: EventKind,
        subreddit: &str,
        skip_existing: bool,
    ) -> Self {
        Self {
            client,
            kind,
            subreddit: subreddit.to_string(),
            buffer: VecDeque::new(),
            seen: BoundedSet::new(SEEN_CAPACITY),
            backoff: ExponentialCounter::new(MAX_POLL_DELAY_SECS),
            skip_existing,
            first_poll: true,
        }
    }

    pub fn comments(client: &'a RedditClient, subreddit: &str, skip_existing: bool) -> Self {
        Self::new(client, EventKind::Comment, subreddit, skip_existing)
    }

    pub fn submissions(client: &'a RedditClient, subreddit: &str, skip_existing: bool) -> Self {
        Self::new(client, EventKind::Submission, subreddit, skip_existing)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    async fn poll(&self) -> Result<Vec<Event>, CoreError> {
        Ok(match self.kind {
            EventKind::Comment => self
                .client
                .new_comments(&self.subreddit, POLL_LIMIT)
                .await?
                .into_iter()
                .map(|c| Event::Comment(c.into()))
                .collect(),
            EventKind::Submission => self
                .client
                .new_submissions(&self.subreddit, POLL_LIMIT)
                .await?
                .into_iter()
                .map(|s| Event::Submission(s.into()))
                .collect(),
        })
    }

    /// Keeps unseen items from a newest-first listing, queued oldest first.
    /// Returns how many were queued.
    fn absorb(&mut self, newest_first: Vec<Event>) -> usize {
        let skip = std::mem::replace(&mut self.first_poll, false) && self.skip_existing;
        let mut queued = 0;

        for event in newest_first.into_iter().rev() {
            if !self.seen.insert(event.id()) {
                continue;
            }
            if !skip {
                self.buffer.push_back(event);
                queued += 1;
            }
        }

        queued
    }
}

impl EventSource for RedditStream<'_> {
    async fn next_event(&mut self) -> Result<Option<Event>, CoreError> {
        loop {
            if let Some(event) = self.buffer.pop_front() {
                return Ok(Some(event));
            }

            let listing = self.poll().await?;
            let fetched = listing.len();
            let queued = self.absorb(listing);
            trace!(
                "Polled r/{} {}: {} fetched, {} new",
                self.subreddit,
                self.kind,
                fetched,
                queued
            );

            if queued == 0 {
                let delay = self.backoff.next_delay();
                debug!("No new {} in r/{}, next poll in {:?}", self.kind, self.subreddit, delay);
                sleep(delay).await;
            } else {
                self.backoff.reset();
            }
        }
    }
}
