// tests/select_rank.rs
use arxiveroo::{identity_of, select, Budget, RawEntry, ScoredEntry, ScorerStatus};

fn scored(link: &str, score: f32, published_at: u64) -> ScoredEntry {
    let entry = RawEntry {
        title: link.to_string(),
        link: format!("https://papers.test/{link}"),
        published_at,
        source_id: "t".into(),
        ..Default::default()
    };
    ScoredEntry {
        identity: identity_of(&entry),
        entry,
        relevance_score: score,
        rationale: String::new(),
        is_relevant: Some(true),
        status: ScorerStatus::Scored,
        attempts: 1,
    }
}

fn titles(scored: &arxiveroo::Selection) -> Vec<String> {
    scored.iter().map(|e| e.entry.title.clone()).collect()
}

#[test]
fn equal_scores_order_by_recency_then_identity() {
    let a = scored("a", 0.7, 100);
    let b = scored("b", 0.7, 100);
    let (first, second) = if a.identity < b.identity { ("a", "b") } else { ("b", "a") };

    let input = vec![
        a,
        scored("newest", 0.7, 300),
        b,
        scored("top", 0.95, 1),
        scored("older", 0.7, 50),
    ];
    let sel = select(input, &Budget::new(None, None).unwrap());
    assert_eq!(
        titles(&sel),
        vec!["top", "newest", first, second, "older"]
    );
}

#[test]
fn input_order_does_not_change_the_result() {
    let mut input = vec![
        scored("a", 0.2, 1),
        scored("b", 0.9, 2),
        scored("c", 0.9, 3),
        scored("d", 0.5, 4),
    ];
    let budget = Budget::new(Some(3), None).unwrap();
    let forward = select(input.clone(), &budget);
    input.reverse();
    let backward = select(input, &budget);
    assert_eq!(forward, backward);
    assert_eq!(titles(&forward), vec!["c", "b", "d"]);
}

#[test]
fn budgets_bound_the_selection() {
    let input = vec![scored("a", 0.99, 1), scored("b", 0.5, 1), scored("c", 0.1, 1)];

    assert!(select(input.clone(), &Budget::new(Some(0), None).unwrap()).is_empty());
    assert!(select(input.clone(), &Budget::new(None, Some(1.0)).unwrap()).is_empty());

    let sel = select(input, &Budget::new(Some(5), Some(0.5)).unwrap());
    assert_eq!(titles(&sel), vec!["a", "b"]);
}

#[test]
fn no_duplicate_identities_in_selection() {
    let input = vec![scored("x", 0.4, 1), scored("x", 0.6, 2), scored("y", 0.5, 1)];
    let sel = select(input, &Budget::default());
    let mut ids: Vec<_> = sel.identities().cloned().collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), sel.len());
    assert_eq!(sel.len(), 2);
}
