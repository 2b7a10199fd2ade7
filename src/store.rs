//! Persistence boundary.
//!
//! The crawler performs no cross-run dedup of its own; the store contract
//! is an idempotent batch insert keyed on `(author_handle, target_url)`
//! where duplicates are silently ignored. [`JsonlStore`] is the bundled
//! implementation: an append-only JSONL file plus an in-memory key set
//! rebuilt from disk at open, so re-running the same search page re-submits
//! rows and they are discarded here.

use crate::core::types::{Mention, StoredMention};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[async_trait]
pub trait MentionStore: Send {
    /// Insert a batch of enriched mentions observed at `crawled_at`.
    /// Returns the number of rows actually inserted; duplicate keys are
    /// silently ignored, never an error.
    async fn insert_batch(
        &mut self,
        mentions: &[Mention],
        crawled_at: DateTime<Utc>,
    ) -> Result<usize>;
}

/// Append-only JSONL store.
pub struct JsonlStore {
    path: PathBuf,
    keys: HashSet<(String, String)>,
}

impl JsonlStore {
    /// Default location: `~/.paper-scout/mentions.jsonl`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".paper-scout").join("mentions.jsonl"))
            .unwrap_or_else(|| PathBuf::from("mentions.jsonl"))
    }

    /// Open (or create) the store, rebuilding the dedup key set from any
    /// existing rows. Unreadable rows are skipped with a warning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating store directory {}", parent.display()))?;
            }
        }

        let mut keys = HashSet::new();
        if path.exists() {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("opening store {}", path.display()))?;
            for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<StoredMention>(&line) {
                    Ok(row) => {
                        keys.insert(row.mention.key());
                    }
                    Err(e) => warn!(
                        "store {}: skipping unreadable row at line {}: {}",
                        path.display(),
                        lineno + 1,
                        e
                    ),
                }
            }
        }

        info!("store {}: {} known mentions", path.display(), keys.len());
        Ok(Self { path, keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl MentionStore for JsonlStore {
    async fn insert_batch(
        &mut self,
        mentions: &[Mention],
        crawled_at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening store {} for append", self.path.display()))?;

        let mut inserted = 0;
        for mention in mentions {
            let key = mention.key();
            if self.keys.contains(&key) {
                debug!("store: duplicate mention @{} -> {}", key.0, key.1);
                continue;
            }
            let row = StoredMention {
                mention: mention.clone(),
                crawled_at,
            };
            let line = serde_json::to_string(&row)?;
            writeln!(file, "{line}")?;
            self.keys.insert(key);
            inserted += 1;
        }
        file.flush()?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Mention;

    fn mention(author: &str, target: &str) -> Mention {
        Mention {
            raw_text: format!("{author} posted {target}"),
            author_handle: author.to_string(),
            profile_image_url: "https://pbs.example/p.jpg".to_string(),
            embedded_image_url: None,
            target_url: target.to_string(),
            matched_source: "arxiv".to_string(),
            view_count: 42,
            metadata: None,
        }
    }

    fn temp_store_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "paper-scout-test-{}-{}.jsonl",
            tag,
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn duplicate_keys_are_silently_ignored_across_reopen() {
        let path = temp_store_path("dedup");
        let _ = std::fs::remove_file(&path);

        let batch = vec![
            mention("alice", "https://arxiv.org/abs/2301.00001"),
            mention("bob", "https://arxiv.org/abs/2301.00002"),
        ];

        let mut store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.insert_batch(&batch, Utc::now()).await.unwrap(), 2);
        // Same run, same batch: nothing new.
        assert_eq!(store.insert_batch(&batch, Utc::now()).await.unwrap(), 0);

        // Fresh open rebuilds the key set from disk.
        let mut reopened = JsonlStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.insert_batch(&batch, Utc::now()).await.unwrap(), 0);

        let lines = std::fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 2);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn same_author_different_paper_is_a_new_row() {
        let path = temp_store_path("keys");
        let _ = std::fs::remove_file(&path);

        let mut store = JsonlStore::open(&path).unwrap();
        let first = vec![mention("alice", "https://arxiv.org/abs/2301.00001")];
        let second = vec![mention("alice", "https://arxiv.org/abs/2301.00002")];
        assert_eq!(store.insert_batch(&first, Utc::now()).await.unwrap(), 1);
        assert_eq!(store.insert_batch(&second, Utc::now()).await.unwrap(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
