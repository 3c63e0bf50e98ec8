mod common;

use bot_service::{Decision, EligibilityGate, PatternLibrary};
use common::{comment, memory_ledger, submission, FakePlatform, Recorder, BOT};
use reply_ledger::ReplyLedger;
use std::sync::Arc;

async fn decide(
    platform: &FakePlatform,
    ledger: &impl ReplyLedger,
    event: &bot_core::Event,
) -> Decision {
    let patterns = PatternLibrary::builtin().unwrap();
    let gate = EligibilityGate::new(&patterns, platform, ledger, 1);
    gate.should_respond(event, &event.combined_text(), &event.context_text())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_trigger_without_suppression_is_eligible() {
    let recorder = Arc::new(Recorder::default());
    let platform = FakePlatform::new(recorder.clone());
    let ledger = memory_ledger();
    let event = comment("c1", "t1", "Cooking", "Is Costco salmon sushi-grade?");

    let patterns = PatternLibrary::builtin().unwrap();
    assert!(patterns.matches_trigger(&event.combined_text()));
    assert!(!patterns.matches_suppression(&event.context_text()));

    assert_eq!(decide(&platform, &ledger, &event).await, Decision::Eligible);
}

#[tokio::test]
async fn test_no_trigger_skips_network_checks() {
    let recorder = Arc::new(Recorder::default());
    let platform = FakePlatform::new(recorder.clone());
    let ledger = memory_ledger();
    let event = comment("c1", "t1", "Cooking", "grilled salmon tonight");

    assert_eq!(decide(&platform, &ledger, &event).await, Decision::NoTrigger);
    assert_eq!(recorder.reply_lookups(), 0);
}

#[tokio::test]
async fn test_aquarium_context_suppresses() {
    let recorder = Arc::new(Recorder::default());
    let platform = FakePlatform::new(recorder.clone());
    let ledger = memory_ledger();

    let event = comment("c1", "t1", "fishkeeping", "my aquarium fish look sashimi-grade");
    assert_eq!(decide(&platform, &ledger, &event).await, Decision::Suppressed);

    // The subreddit name alone is enough for comments
    let event = comment("c2", "t2", "Aquariums", "sashimi-grade lol");
    assert_eq!(decide(&platform, &ledger, &event).await, Decision::Suppressed);
    assert_eq!(recorder.reply_lookups(), 0);
}

#[tokio::test]
async fn test_existing_reply_by_bot_blocks() {
    let recorder = Arc::new(Recorder::default());
    let platform = FakePlatform::new(recorder.clone())
        .with_reply_authors("c1", &["alice", "Sushi-Grade-Bot"])
        .with_reply_authors("s1", &[BOT]);
    let ledger = memory_ledger();

    let event = comment("c1", "t1", "Cooking", "sushi grade tuna?");
    assert_eq!(decide(&platform, &ledger, &event).await, Decision::AlreadyReplied);

    let event = submission("s1", "Anisakis in salmon", "");
    assert_eq!(decide(&platform, &ledger, &event).await, Decision::AlreadyReplied);
}

#[tokio::test]
async fn test_thread_ceiling_blocks_submissions_and_comments() {
    let recorder = Arc::new(Recorder::default());
    let platform = FakePlatform::new(recorder);
    let ledger = memory_ledger();
    ledger.increment("t1").await.unwrap();

    let event = comment("c9", "t1", "Cooking", "sushi grade tuna?");
    assert_eq!(
        decide(&platform, &ledger, &event).await,
        Decision::ThreadLimitReached { replies: 1 }
    );

    let event = submission("t1", "Is sushi-grade a real thing?", "");
    assert!(!decide(&platform, &ledger, &event).await.is_eligible());
}

#[tokio::test]
async fn test_gate_is_idempotent() {
    let recorder = Arc::new(Recorder::default());
    let platform = FakePlatform::new(recorder.clone());
    let ledger = memory_ledger();
    let event = submission("s1", "Freezing fish to kill parasites", "home freezer ok?");

    let first = decide(&platform, &ledger, &event).await;
    let second = decide(&platform, &ledger, &event).await;

    assert_eq!(first, second);
    assert_eq!(first, Decision::Eligible);
    assert_eq!(ledger.get("s1").await.unwrap(), 0);
    assert!(recorder.posted().is_empty());
}
