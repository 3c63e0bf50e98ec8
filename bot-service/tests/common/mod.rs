#![allow(dead_code)]

use bot_core::{
    CommentEvent, Connector, CoreError, Event, EventKind, EventSource, Identity, Platform,
    PostedReply, Publisher, RedditApiError, SubmissionEvent, ThreadReplies,
};
use reply_ledger::{MemoryObjectStore, SnapshotLedger};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BOT: &str = "sushi-grade-bot";

pub fn comment(id: &str, thread_id: &str, subreddit: &str, body: &str) -> Event {
    Event::Comment(CommentEvent {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        author: "someone".to_string(),
        subreddit: subreddit.to_string(),
        body: body.to_string(),
        permalink: format!("/r/{}/comments/{}/_/{}/", subreddit, thread_id, id),
    })
}

pub fn submission(id: &str, title: &str, selftext: &str) -> Event {
    Event::Submission(SubmissionEvent {
        id: id.to_string(),
        author: "someone".to_string(),
        subreddit: "Cooking".to_string(),
        title: title.to_string(),
        selftext: selftext.to_string(),
        permalink: format!("https://redd.it/{}", id),
    })
}

pub fn memory_ledger() -> SnapshotLedger<MemoryObjectStore> {
    SnapshotLedger::new(MemoryObjectStore::new(), "reddit-sushi-grade-bot", "cache.json")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub parent: String,
    pub reply: String,
    pub text: String,
}

/// Everything the fakes did, shared across sessions.
#[derive(Debug, Default)]
pub struct Recorder {
    pub posted: Mutex<Vec<Posted>>,
    pub upvoted: Mutex<Vec<String>>,
    pub retracted: Mutex<Vec<String>>,
    pub reply_lookups: AtomicUsize,
}

impl Recorder {
    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }

    pub fn upvoted(&self) -> Vec<String> {
        self.upvoted.lock().unwrap().clone()
    }

    pub fn retracted(&self) -> Vec<String> {
        self.retracted.lock().unwrap().clone()
    }

    pub fn reply_lookups(&self) -> usize {
        self.reply_lookups.load(Ordering::SeqCst)
    }
}

/// Scripted platform session. Its streams hand out the scripted events in
/// order, then report the source closed.
#[derive(Debug)]
pub struct FakePlatform {
    username: String,
    events: Mutex<VecDeque<Result<Event, CoreError>>>,
    reply_authors: HashMap<String, Vec<String>>,
    own_replies: Vec<PostedReply>,
    failing_replies: bool,
    recorder: Arc<Recorder>,
}

impl FakePlatform {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self {
            username: BOT.to_string(),
            events: Mutex::new(VecDeque::new()),
            reply_authors: HashMap::new(),
            own_replies: Vec::new(),
            failing_replies: false,
            recorder,
        }
    }

    pub fn with_events(self, events: Vec<Event>) -> Self {
        self.with_script(events.into_iter().map(Ok).collect())
    }

    pub fn with_script(self, script: Vec<Result<Event, CoreError>>) -> Self {
        self.events.lock().unwrap().extend(script);
        self
    }

    pub fn with_reply_authors(mut self, event_id: &str, authors: &[&str]) -> Self {
        self.reply_authors.insert(
            event_id.to_string(),
            authors.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    /// Every `reply` fails with a 500 and posts nothing.
    pub fn with_failing_replies(mut self) -> Self {
        self.failing_replies = true;
        self
    }

    pub fn with_own_replies(mut self, scores: &[i64]) -> Self {
        self.own_replies = scores
            .iter()
            .enumerate()
            .map(|(i, score)| PostedReply {
                fullname: format!("t1_own{}", i),
                permalink: format!("/r/sushi/comments/t/_/own{}/", i),
                score: *score,
            })
            .collect();
        self
    }
}

impl ThreadReplies for FakePlatform {
    async fn reply_authors(&self, event: &Event) -> Result<Vec<String>, CoreError> {
        self.recorder.reply_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply_authors.get(event.id()).cloned().unwrap_or_default())
    }
}

impl Publisher for FakePlatform {
    async fn reply(&self, event: &Event, text: &str) -> Result<String, CoreError> {
        if self.failing_replies {
            return Err(CoreError::RedditApi(RedditApiError::ServerError {
                status_code: 500,
            }));
        }

        let mut posted = self.recorder.posted.lock().unwrap();
        let reply = format!("t1_reply{}", posted.len());
        posted.push(Posted {
            parent: event.fullname(),
            reply: reply.clone(),
            text: text.to_string(),
        });
        Ok(reply)
    }

    async fn upvote(&self, fullname: &str) -> Result<(), CoreError> {
        self.recorder.upvoted.lock().unwrap().push(fullname.to_string());
        Ok(())
    }

    async fn retract(&self, fullname: &str) -> Result<(), CoreError> {
        self.recorder.retracted.lock().unwrap().push(fullname.to_string());
        Ok(())
    }
}

impl Identity for FakePlatform {
    fn username(&self) -> &str {
        &self.username
    }

    async fn recent_replies(&self, limit: u32) -> Result<Vec<PostedReply>, CoreError> {
        Ok(self.own_replies.iter().take(limit as usize).cloned().collect())
    }
}

pub struct FakeStream<'a> {
    platform: &'a FakePlatform,
}

impl EventSource for FakeStream<'_> {
    async fn next_event(&mut self) -> Result<Option<Event>, CoreError> {
        match self.platform.events.lock().unwrap().pop_front() {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

impl Platform for FakePlatform {
    type Stream<'a> = FakeStream<'a>;

    fn stream(&self, _kind: EventKind) -> FakeStream<'_> {
        FakeStream { platform: self }
    }
}

/// Hands out one prepared session per connect.
pub struct FakeConnector {
    sessions: Mutex<VecDeque<FakePlatform>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(sessions: Vec<FakePlatform>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Platform = FakePlatform;

    async fn connect(&self) -> Result<FakePlatform, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CoreError::Internal {
                message: "no scripted session left".to_string(),
            })
    }
}
