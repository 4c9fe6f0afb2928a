// tests/offline_digest.rs
// Full offline run over the three fixture feeds with the keyword judge and a
// file-backed seen store, twice.

use arxiveroo::analyze::{KeywordJudge, RelevanceScorer, RetryPolicy};
use arxiveroo::dedup::JsonFileStore;
use arxiveroo::ingest::fetch::StaticFetcher;
use arxiveroo::pipeline::{Pipeline, PipelineOptions};
use arxiveroo::report::{render_json, render_markdown};
use arxiveroo::{Budget, FeedSource, InterestProfile, RunWarning};
use std::sync::Arc;

const ARXIV_XML: &str = include_str!("fixtures/arxiv_atom.xml");
const RSS_XML: &str = include_str!("fixtures/rss.xml");
const BIORXIV_JSON: &str = include_str!("fixtures/biorxiv.json");

const ARXIV_URL: &str = "http://export.arxiv.org/api/query?search_query=cat:q-bio.BM";
const RSS_URL: &str = "https://lab.example.org/feed.xml";
const BIORXIV_URL: &str = "https://api.biorxiv.org/details/biorxiv/2024-03-04/2024-03-11";

fn sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("arxiv", ARXIV_URL, "arXiv"),
        FeedSource::new("lab", RSS_URL, "Lab"),
        FeedSource::new("biorxiv", BIORXIV_URL, "bioRxiv").with_categories(["Genomics", "Bioinformatics"]),
    ]
}

fn pipeline() -> Pipeline {
    let fetcher = StaticFetcher::new()
        .with_document(ARXIV_URL, ARXIV_XML)
        .with_document(RSS_URL, RSS_XML)
        .with_document(BIORXIV_URL, BIORXIV_JSON);
    let scorer = RelevanceScorer::new(Arc::new(KeywordJudge), RetryPolicy::default());
    Pipeline::new(Arc::new(fetcher), scorer, PipelineOptions::default())
}

#[tokio::test]
async fn keyword_digest_ranks_and_remembers() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(tmp.path().join("seen.json"));
    let profile = InterestProfile::new("protein language models, single-cell genomics").unwrap();
    let p = pipeline();

    let first = p
        .run(&sources(), &profile, &Budget::default(), &store)
        .await
        .unwrap();

    let titles: Vec<&str> = first.selection.iter().map(|e| e.entry.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Protein language models predict variant effects in genomics screens",
            "Protein Language Models Learn Evolutionary Couplings",
            "Graph Neural Networks for Single-Cell Genomics",
            "A single-cell atlas of the developing human retina",
            "Spatial transcriptomics at subcellular resolution",
        ]
    );
    assert_eq!(first.stats.filtered_out, 1);
    // the title-less arXiv entry
    assert_eq!(first.warnings.len(), 1);
    assert!(matches!(&first.warnings[0], RunWarning::Parse { source_id, .. } if source_id == "arxiv"));

    let md = render_markdown(&first);
    assert!(md.starts_with(
        "## Paper 1\n**Title:** Protein language models predict variant effects in genomics screens\n**Score:** 10.0\n"
    ));
    let json: serde_json::Value = serde_json::from_str(&render_json(&first).unwrap()).unwrap();
    assert_eq!(json["items"].as_array().map(Vec::len), Some(5));

    // second run: everything shown before is filtered out
    let second = p
        .run(&sources(), &profile, &Budget::default(), &store)
        .await
        .unwrap();
    assert!(second.selection.is_empty());
    assert_eq!(second.stats.already_seen, 5);
}
