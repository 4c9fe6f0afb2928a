// src/dedup/mod.rs
//! Dedup store: entry fingerprints and the cross-run seen set.

pub mod store;

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::types::{EntryIdentity, RawEntry};

pub use store::{JsonFileStore, MemoryStore, SeenSet, SeenStore};

/// Deterministic fingerprint. Keyed on the canonical link when there is one,
/// otherwise on source + normalized title + publish time.
pub fn identity_of(entry: &RawEntry) -> EntryIdentity {
    let link = canonical_link(&entry.link);
    let key = if link.is_empty() {
        format!(
            "entry:{}|{}|{}",
            entry.source_id,
            fold_title(&entry.title),
            entry.published_at
        )
    } else {
        format!("link:{link}")
    };
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    EntryIdentity(out)
}

/// Scheme-insensitive, host lowercased, no trailing slash.
pub fn canonical_link(link: &str) -> String {
    let l = link.trim();
    if l.is_empty() {
        return String::new();
    }
    let lower = l.to_ascii_lowercase();
    let rest = if lower.starts_with("https://") {
        &l[8..]
    } else if lower.starts_with("http://") {
        &l[7..]
    } else {
        l
    };
    let (host, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let mut out = host.to_ascii_lowercase();
    out.push_str(path.trim_end_matches('/'));
    out
}

fn fold_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// An entry that survived dedup, paired with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub identity: EntryIdentity,
    pub entry: RawEntry,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub candidates: Vec<Candidate>,
    /// Dropped because a previous run presented them.
    pub already_seen: usize,
    /// Dropped because an earlier entry in this batch had the same identity.
    pub repeated: usize,
}

/// Sole owner of the seen set during a run.
pub struct DedupStore {
    seen: SeenSet,
    added: usize,
    load_failed: bool,
}

impl DedupStore {
    pub fn new(seen: SeenSet) -> Self {
        Self {
            seen,
            added: 0,
            load_failed: false,
        }
    }

    /// Load from `store`; an unreadable or corrupt store degrades to empty
    /// and will not be overwritten by [`DedupStore::commit`].
    pub fn load(store: &dyn SeenStore) -> (Self, Option<PersistenceError>) {
        match store.load_all() {
            Ok(seen) => {
                debug!(store = %store.describe(), seen = seen.len(), "seen set loaded");
                (Self::new(seen), None)
            }
            Err(err) => {
                warn!(store = %store.describe(), error = %err, "seen set unavailable, starting empty");
                let mut dedup = Self::new(SeenSet::default());
                dedup.load_failed = true;
                (dedup, Some(err))
            }
        }
    }

    pub fn is_seen(&self, id: &EntryIdentity) -> bool {
        self.seen.contains(id)
    }

    /// Keep entries whose identity is neither seen nor repeated, in input order.
    pub fn filter_unseen<I>(&self, entries: I) -> DedupOutcome
    where
        I: IntoIterator<Item = RawEntry>,
    {
        let mut out = DedupOutcome::default();
        let mut batch: HashSet<EntryIdentity> = HashSet::new();
        for entry in entries {
            let identity = identity_of(&entry);
            if self.seen.contains(&identity) {
                out.already_seen += 1;
                continue;
            }
            if !batch.insert(identity.clone()) {
                out.repeated += 1;
                continue;
            }
            out.candidates.push(Candidate { identity, entry });
        }
        out
    }

    /// Append-only. Returns how many identities were new.
    pub fn mark_seen<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a EntryIdentity>,
    {
        let mut fresh = 0;
        for id in ids {
            if self.seen.insert(id.clone()) {
                fresh += 1;
            }
        }
        self.added += fresh;
        fresh
    }

    /// Identities added since load.
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Whether the initial load failed and the set started empty.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Save-all. Refuses when the load failed: the set only holds this run's
    /// identities and would replace whatever the store still has.
    pub fn commit(&self, store: &dyn SeenStore) -> Result<(), PersistenceError> {
        if self.load_failed {
            return Err(PersistenceError::NotOverwritten {
                store: store.describe(),
            });
        }
        store.save_all(&self.seen)
    }
}
