use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use inbox_triage::intent::IntentCache;
use inbox_triage::{
    IntentAnalyzer, IntentError, MergeConfig, MergeState, Message, SummarizerError,
    ThreadSummarizer, ThreadingConfig, TriageConfig, TriagePipeline, TriageRequest,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, day, hour, 0, 0).unwrap()
}

fn config() -> TriageConfig {
    TriageConfig {
        threading: ThreadingConfig::default(),
        merge: MergeConfig::default(),
        vip_addresses: HashSet::new(),
        ignored_participants: HashSet::new(),
    }
}

fn analyzer() -> IntentAnalyzer {
    IntentAnalyzer::new(HashSet::new())
        .with_cache(Arc::new(IntentCache::new()))
        .with_reference_time(at(20, 12))
}

fn pipeline() -> TriagePipeline {
    TriagePipeline::new(config()).with_analyzer(analyzer())
}

/// Two offsite threads whose parents were never delivered, plus an unrelated lunch note.
fn inbox() -> Vec<Message> {
    vec![
        Message::new("<offsite-1@corp.com>", "Offsite planning", at(18, 9))
            .with_sender("Dana Scully <dana@corp.com>")
            .with_recipients("me@corp.com")
            .with_in_reply_to("<lost-1@corp.com>"),
        Message::new("<offsite-2@corp.com>", "Offsite planning", at(19, 9))
            .with_sender("Dana Scully <dana@corp.com>")
            .with_recipients("me@corp.com")
            .with_in_reply_to("<lost-2@corp.com>"),
        Message::new("<lunch@corp.com>", "Lunch menu", at(17, 11))
            .with_sender("chef@corp.com")
            .with_recipients("team@corp.com"),
    ]
}

fn set(values: &[&str]) -> HashSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn similar_threads_with_shared_people_become_one_group() {
    let outcome = pipeline().run(inbox(), &TriageRequest::default()).await.unwrap();

    assert_eq!(outcome.threads.len(), 3);
    assert_eq!(outcome.groups.len(), 2);

    let offsite = outcome
        .groups
        .iter()
        .find(|g| g.id.starts_with("offsite"))
        .unwrap();
    assert_eq!(offsite.related.len(), 1);
    assert_eq!(offsite.merge_reasons.len(), 1);
    assert_eq!(
        offsite.merge_reasons[0].shared_participants,
        vec!["dana@corp.com".to_string(), "me@corp.com".to_string()]
    );
    assert!(offsite.merge_reasons[0].similarity >= 0.82);
    assert_eq!(offsite.merge_state, MergeState::Suggested);
}

#[tokio::test]
async fn ignored_participants_block_the_merge() {
    let request = TriageRequest {
        ignored_participants: set(&["dana@corp.com", "ME@corp.com"]),
        ..TriageRequest::default()
    };

    let outcome = pipeline().run(inbox(), &request).await.unwrap();

    assert_eq!(outcome.groups.len(), 3);
    assert!(outcome.groups.iter().all(|g| g.related.is_empty()));
}

#[tokio::test]
async fn accepted_override_pulls_in_every_other_thread() {
    let request = TriageRequest {
        merge_overrides: HashMap::from([("lunch@corp.com".to_string(), MergeState::Accepted)]),
        ..TriageRequest::default()
    };

    let outcome = pipeline().run(inbox(), &request).await.unwrap();

    assert_eq!(outcome.groups.len(), 1);
    let group = &outcome.groups[0];
    assert_eq!(group.id, "lunch@corp.com");
    assert_eq!(group.merge_state, MergeState::Accepted);
    assert_eq!(group.related.len(), 2);
    assert!(
        group
            .merge_reasons
            .iter()
            .all(|reason| reason.description == "Accepted by user")
    );
}

#[tokio::test]
async fn pinned_group_is_listed_first() {
    let request = TriageRequest {
        pinned: set(&["lunch@corp.com"]),
        ..TriageRequest::default()
    };

    let outcome = pipeline().run(inbox(), &request).await.unwrap();

    assert_eq!(outcome.groups[0].id, "lunch@corp.com");
    assert!(outcome.groups[0].pinned);
    assert!(outcome.groups[1..].iter().all(|g| !g.pinned));
}

struct FixedSummarizer;

#[async_trait]
impl ThreadSummarizer for FixedSummarizer {
    async fn summarize_thread(&self, subjects: &[String]) -> Result<String, SummarizerError> {
        Ok(format!("About {}", subjects[0]))
    }
}

#[tokio::test]
async fn summaries_come_from_the_summarizer() {
    let pipeline = TriagePipeline::new(config())
        .with_analyzer(analyzer().with_summarizer(Arc::new(FixedSummarizer)));

    let outcome = pipeline.run(inbox(), &TriageRequest::default()).await.unwrap();

    let lunch = outcome.groups.iter().find(|g| g.id == "lunch@corp.com").unwrap();
    assert_eq!(lunch.summary(), "About Lunch menu");
    assert_eq!(
        pipeline.analyzer().cache().summary("lunch@corp.com").as_deref(),
        Some("About Lunch menu")
    );
}

struct StalledSummarizer;

#[async_trait]
impl ThreadSummarizer for StalledSummarizer {
    async fn summarize_thread(&self, _subjects: &[String]) -> Result<String, SummarizerError> {
        std::future::pending::<()>().await;
        Err(SummarizerError::Unavailable("never".to_string()))
    }
}

#[tokio::test]
async fn cancellation_abandons_the_run() {
    let pipeline = TriagePipeline::new(config())
        .with_analyzer(analyzer().with_summarizer(Arc::new(StalledSummarizer)));
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = pipeline
        .run_with_cancellation(inbox(), &TriageRequest::default(), &token)
        .await;

    assert_eq!(result.unwrap_err(), IntentError::Cancelled);
    assert!(pipeline.analyzer().cache().is_empty());
}

#[test]
fn request_reads_camel_case_json() {
    let request: TriageRequest = serde_json::from_str(
        r#"{"mergeOverrides": {"a@x": "reverted"}, "pinned": ["b@x"]}"#,
    )
    .unwrap();

    assert_eq!(request.merge_overrides["a@x"], MergeState::Reverted);
    assert!(request.pinned.contains("b@x"));
    assert!(request.ignored_participants.is_empty());
}
