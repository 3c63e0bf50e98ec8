use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CommentEvent {
    pub id: String,
    /// Id of the submission this comment belongs to, without the `t3_` prefix
    pub thread_id: String,
    pub author: String,
    pub subreddit: String,
    pub body: String,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionEvent {
    pub id: String,
    pub author: String,
    pub subreddit: String,
    pub title: String,
    pub selftext: String,
    pub permalink: String,
}

/// A single observation pulled off the live stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Comment(CommentEvent),
    Submission(SubmissionEvent),
}

impl Event {
    pub fn id(&self) -> &str {
        match self {
            Event::Comment(c) => &c.id,
            Event::Submission(s) => &s.id,
        }
    }

    /// Type-prefixed id the posting endpoints expect (`t1_…` / `t3_…`).
    pub fn fullname(&self) -> String {
        match self {
            Event::Comment(c) => format!("t1_{}", c.id),
            Event::Submission(s) => format!("t3_{}", s.id),
        }
    }

    pub fn thread_id(&self) -> &str {
        match self {
            Event::Comment(c) => &c.thread_id,
            Event::Submission(s) => &s.id,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            Event::Comment(c) => &c.author,
            Event::Submission(s) => &s.author,
        }
    }

    pub fn subreddit(&self) -> &str {
        match self {
            Event::Comment(c) => &c.subreddit,
            Event::Submission(s) => &s.subreddit,
        }
    }

    pub fn permalink(&self) -> &str {
        match self {
            Event::Comment(c) => &c.permalink,
            Event::Submission(s) => &s.permalink,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Comment(_) => EventKind::Comment,
            Event::Submission(_) => EventKind::Submission,
        }
    }

    /// Text the trigger patterns run against.
    pub fn combined_text(&self) -> String {
        match self {
            Event::Comment(c) => c.body.clone(),
            Event::Submission(s) => format!("{} {}", s.title, s.selftext),
        }
    }

    /// Text the suppression patterns run against. Comments carry their
    /// subreddit name so community-level vetoes (r/Aquariums) apply.
    pub fn context_text(&self) -> String {
        match self {
            Event::Comment(c) => format!("{} : {}", c.subreddit, c.body),
            Event::Submission(_) => self.combined_text(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Comment,
    Submission,
}

impl EventKind {
    pub fn singular(&self) -> &'static str {
        match self {
            EventKind::Comment => "comment",
            EventKind::Submission => "submission",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Comment => write!(f, "comments"),
            EventKind::Submission => write!(f, "submissions"),
        }
    }
}

/// One of the bot's own replies as the platform currently reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedReply {
    pub fullname: String,
    pub permalink: String,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Comments,
    Submissions,
    Cleanup,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Comments => write!(f, "comment"),
            Mode::Submissions => write!(f, "submission"),
            Mode::Cleanup => write!(f, "cleanup"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment() -> Event {
        Event::Comment(CommentEvent {
            id: "c1".to_string(),
            thread_id: "abc".to_string(),
            author: "someone".to_string(),
            subreddit: "Cooking".to_string(),
            body: "Is costco salmon ok for sushi?".to_string(),
            permalink: "/r/Cooking/comments/abc/_/c1/".to_string(),
        })
    }

    fn submission() -> Event {
        Event::Submission(SubmissionEvent {
            id: "abc".to_string(),
            author: "someone".to_string(),
            subreddit: "sushi".to_string(),
            title: "Sushi grade tuna".to_string(),
            selftext: "where to buy?".to_string(),
            permalink: "https://redd.it/abc".to_string(),
        })
    }

    #[test]
    fn test_comment_texts_and_ids() {
        let event = comment();
        assert_eq!(event.fullname(), "t1_c1");
        assert_eq!(event.thread_id(), "abc");
        assert_eq!(event.combined_text(), "Is costco salmon ok for sushi?");
        assert_eq!(
            event.context_text(),
            "Cooking : Is costco salmon ok for sushi?"
        );
    }

    #[test]
    fn test_submission_is_its_own_thread() {
        let event = submission();
        assert_eq!(event.fullname(), "t3_abc");
        assert_eq!(event.thread_id(), "abc");
        assert_eq!(event.combined_text(), "Sushi grade tuna where to buy?");
        assert_eq!(event.context_text(), event.combined_text());
        assert_eq!(event.kind(), EventKind::Submission);
    }
}
