// tests/pipeline_e2e.rs
use arxiveroo::analyze::{RelevanceJudge, RelevanceScorer, RetryPolicy};
use arxiveroo::dedup::{identity_of, JsonFileStore, MemoryStore, SeenSet, SeenStore};
use arxiveroo::ingest::fetch::{FeedFetcher, StaticFetcher};
use arxiveroo::pipeline::{Pipeline, PipelineOptions};
use arxiveroo::{
    Budget, ConfigError, EntryIdentity, FeedSource, FetchError, InterestProfile, JudgeError,
    PersistenceError, RawEntry, RunWarning,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const FEED_A: &str = "https://feeds.test/a.xml";
const FEED_B: &str = "https://feeds.test/b.xml";

fn link(slug: &str) -> String {
    format!("https://papers.test/{slug}")
}

fn rss(slugs: &[&str]) -> String {
    let items: String = slugs
        .iter()
        .map(|s| {
            format!(
                "<item><title>{s}</title><link>{}</link><description>About {s}.</description>\
                 <pubDate>Mon, 11 Mar 2024 08:00:00 +0000</pubDate></item>",
                link(s)
            )
        })
        .collect();
    format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>{items}</channel></rss>")
}

fn identity(slug: &str) -> EntryIdentity {
    identity_of(&RawEntry {
        link: link(slug),
        ..Default::default()
    })
}

/// Scores by title; unknown titles are rejected. Optional delay makes
/// low scores finish first.
struct TableJudge {
    table: HashMap<&'static str, f64>,
    delayed: bool,
}

impl TableJudge {
    fn new(rows: &[(&'static str, f64)]) -> Self {
        Self {
            table: rows.iter().cloned().collect(),
            delayed: false,
        }
    }
}

#[async_trait]
impl RelevanceJudge for TableJudge {
    fn name(&self) -> &'static str {
        "table"
    }

    async fn judge(&self, entry_text: &str, _profile: &InterestProfile) -> Result<String, JudgeError> {
        let title = entry_text
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("Title: "))
            .unwrap_or_default();
        let Some(score) = self.table.get(title) else {
            return Err(JudgeError::Rejected(format!("no verdict for {title}")));
        };
        if self.delayed {
            tokio::time::sleep(Duration::from_millis(((1.0 - score) * 60.0) as u64)).await;
        }
        Ok(serde_json::json!({
            "score": score,
            "reason": format!("about {title}"),
            "is_relevant": true,
        })
        .to_string())
    }
}

struct SleepyJudge;

#[async_trait]
impl RelevanceJudge for SleepyJudge {
    fn name(&self) -> &'static str {
        "sleepy"
    }

    async fn judge(&self, _entry_text: &str, _profile: &InterestProfile) -> Result<String, JudgeError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(r#"{"relevance_score": 10}"#.into())
    }
}

struct HangingFetcher;

#[async_trait]
impl FeedFetcher for HangingFetcher {
    async fn fetch(&self, _source: &FeedSource) -> Result<String, FetchError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(String::new())
    }
}

struct BrokenStore;

impl SeenStore for BrokenStore {
    fn load_all(&self) -> Result<SeenSet, PersistenceError> {
        Err(PersistenceError::Corrupt {
            path: "seen.json".into(),
            reason: "truncated".into(),
        })
    }

    fn save_all(&self, _set: &SeenSet) -> Result<(), PersistenceError> {
        Err(PersistenceError::Write {
            path: "seen.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn describe(&self) -> String {
        "broken".into()
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
        call_timeout_secs: 5,
    }
}

fn pipeline(fetcher: Arc<dyn FeedFetcher>, judge: Arc<dyn RelevanceJudge>, options: PipelineOptions) -> Pipeline {
    Pipeline::new(fetcher, RelevanceScorer::new(judge, policy()), options)
}

fn sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("a", FEED_A, "Feed A"),
        FeedSource::new("b", FEED_B, "Feed B"),
    ]
}

fn profile() -> InterestProfile {
    InterestProfile::new("protein design").unwrap()
}

fn titles(report: &arxiveroo::RunReport) -> Vec<String> {
    report.selection.iter().map(|e| e.entry.title.clone()).collect()
}

#[tokio::test]
async fn unreachable_feed_is_a_warning_not_a_failure() {
    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["p1", "p2"]));
    let judge = TableJudge::new(&[("p1", 0.8), ("p2", 0.4)]);
    let p = pipeline(Arc::new(fetcher), Arc::new(judge), PipelineOptions::default());
    let store = MemoryStore::new();

    let report = p
        .run(&sources(), &profile(), &Budget::default(), &store)
        .await
        .expect("run completes");

    assert_eq!(titles(&report), vec!["p1", "p2"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(&report.warnings[0], RunWarning::Fetch { source_id, .. } if source_id == "b"));
    assert_eq!(report.stats.sources_failed, 1);
}

#[tokio::test]
async fn seen_entries_are_skipped_and_only_the_selection_is_committed() {
    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["old1", "new1", "old2", "new2", "new3"]));
    let judge = TableJudge::new(&[
        ("old1", 1.0),
        ("old2", 1.0),
        ("new1", 0.9),
        ("new2", 0.2),
        ("new3", 0.6),
    ]);
    let p = pipeline(Arc::new(fetcher), Arc::new(judge), PipelineOptions::default());
    let store = MemoryStore::with_seen(SeenSet::from_identities([identity("old1"), identity("old2")]));
    let budget = Budget::new(Some(2), Some(0.5)).unwrap();

    let report = p
        .run(&sources()[..1], &profile(), &budget, &store)
        .await
        .unwrap();

    assert_eq!(titles(&report), vec!["new1", "new3"]);
    assert!((report.selection.entries()[0].relevance_score - 0.9).abs() < 1e-6);
    assert_eq!(report.stats.already_seen, 2);
    assert_eq!(report.stats.candidates, 3);
    assert_eq!(report.stats.newly_seen, 2);

    let seen = store.snapshot();
    assert_eq!(seen.len(), 4);
    assert!(seen.contains(&identity("new1")));
    assert!(seen.contains(&identity("new3")));
    assert!(!seen.contains(&identity("new2")));
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn failed_entries_are_never_selected_or_seen() {
    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["good", "mystery"]));
    let judge = TableJudge::new(&[("good", 0.7)]);
    let p = pipeline(Arc::new(fetcher), Arc::new(judge), PipelineOptions::default());
    let store = MemoryStore::new();

    let report = p
        .run(&sources()[..1], &profile(), &Budget::new(None, None).unwrap(), &store)
        .await
        .unwrap();

    assert_eq!(titles(&report), vec!["good"]);
    assert_eq!(report.stats.failed, 1);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, RunWarning::Scorer { title, .. } if title == "mystery")));
    assert!(!store.snapshot().contains(&identity("mystery")));
}

#[tokio::test]
async fn completion_order_does_not_leak_into_the_selection() {
    let slugs = ["s1", "s2", "s3", "s4", "s5", "s6"];
    let rows = [
        ("s1", 0.1),
        ("s2", 0.9),
        ("s3", 0.5),
        ("s4", 0.7),
        ("s5", 0.3),
        ("s6", 0.8),
    ];

    let mut results = Vec::new();
    for concurrency in [1, 6] {
        let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&slugs));
        let mut judge = TableJudge::new(&rows);
        judge.delayed = true;
        let options = PipelineOptions {
            score_concurrency: concurrency,
            ..Default::default()
        };
        let p = pipeline(Arc::new(fetcher), Arc::new(judge), options);
        let report = p
            .run(&sources()[..1], &profile(), &Budget::new(None, None).unwrap(), &MemoryStore::new())
            .await
            .unwrap();
        results.push(titles(&report));
    }

    assert_eq!(results[0], vec!["s2", "s6", "s4", "s3", "s5", "s1"]);
    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn cancelled_run_leaves_the_store_untouched() {
    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["p1", "p2"]));
    let p = pipeline(Arc::new(fetcher), Arc::new(SleepyJudge), PipelineOptions::default());
    let store = MemoryStore::with_seen(SeenSet::from_identities([identity("older")]));

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        p.run(&sources()[..1], &profile(), &Budget::default(), &store),
    )
    .await;

    assert!(outcome.is_err(), "run should still be scoring");
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn slow_feed_times_out_on_its_own() {
    let options = PipelineOptions {
        fetch_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let p = pipeline(Arc::new(HangingFetcher), Arc::new(TableJudge::new(&[])), options);

    let report = p
        .run(&sources(), &profile(), &Budget::default(), &MemoryStore::new())
        .await
        .unwrap();

    assert!(report.selection.is_empty());
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().all(|w| w.to_string().contains("timed out")));
}

#[tokio::test]
async fn invalid_budget_is_the_only_fatal_error() {
    let p = pipeline(
        Arc::new(StaticFetcher::new()),
        Arc::new(TableJudge::new(&[])),
        PipelineOptions::default(),
    );
    let budget = Budget {
        min_score: Some(7.0),
        ..Default::default()
    };

    let err = p
        .run(&sources(), &profile(), &budget, &MemoryStore::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBudget(_)));
}

#[tokio::test]
async fn broken_store_degrades_with_warnings() {
    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["p1"]));
    let p = pipeline(
        Arc::new(fetcher),
        Arc::new(TableJudge::new(&[("p1", 0.9)])),
        PipelineOptions::default(),
    );

    let report = p
        .run(&sources()[..1], &profile(), &Budget::default(), &BrokenStore)
        .await
        .unwrap();

    assert_eq!(titles(&report), vec!["p1"]);
    let persistence = report
        .warnings
        .iter()
        .filter(|w| matches!(w, RunWarning::Persistence { .. }))
        .count();
    assert_eq!(persistence, 2);
}

#[tokio::test]
async fn unloadable_store_keeps_its_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.json");
    let original = r#"{"version": 2, "seen": ["aaaa", "bbbb", "cccc"]}"#;
    std::fs::write(&path, original).unwrap();

    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["p1"]));
    let p = pipeline(
        Arc::new(fetcher),
        Arc::new(TableJudge::new(&[("p1", 0.9)])),
        PipelineOptions::default(),
    );
    let report = p
        .run(&sources()[..1], &profile(), &Budget::default(), &JsonFileStore::new(&path))
        .await
        .unwrap();

    assert_eq!(titles(&report), vec!["p1"]);
    let persistence: Vec<String> = report
        .warnings
        .iter()
        .filter(|w| matches!(w, RunWarning::Persistence { .. }))
        .map(ToString::to_string)
        .collect();
    assert_eq!(persistence.len(), 2);
    assert!(persistence[0].contains("unsupported format version 2"));
    assert!(persistence[1].contains("left as is"));
    assert_eq!(report.stats.newly_seen, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[tokio::test]
async fn dry_run_commits_nothing() {
    let fetcher = StaticFetcher::new().with_document(FEED_A, rss(&["p1"]));
    let options = PipelineOptions {
        commit_seen: false,
        ..Default::default()
    };
    let p = pipeline(Arc::new(fetcher), Arc::new(TableJudge::new(&[("p1", 0.9)])), options);
    let store = MemoryStore::new();

    let report = p
        .run(&sources()[..1], &profile(), &Budget::default(), &store)
        .await
        .unwrap();

    assert_eq!(report.selection.len(), 1);
    assert_eq!(report.stats.newly_seen, 0);
    assert_eq!(store.save_count(), 0);
}
