//! Directory-backed local store
//!
//! One JSON document per item under a root directory. Writes go to a
//! temporary file first and are renamed into place, so a crash mid-write
//! never leaves a half-written item behind.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use async_trait::async_trait;

use crate::provider::Record;

use super::{
    count_gaps, validate_series, ItemMetadata, StoreError, StoreResult, StoredItem,
    TimeseriesStore, WriteItem,
};

/// JSON-file store rooted at a single directory
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store at `root`, creating the directory if missing.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "local store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys may carry separators like `BTC-USDT:1d`; map anything that is
    /// not filename-safe to `_`.
    fn item_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", safe))
    }

    async fn persist(&self, key: &str, item: &StoredItem) -> StoreResult<()> {
        let path = self.item_path(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(item)?;
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        debug!(key, path = %path.display(), rows = item.data.len(), "item persisted");
        Ok(())
    }

    async fn load(&self, key: &str) -> StoreResult<StoredItem> {
        let path = self.item_path(key);
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TimeseriesStore for LocalStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        match fs::metadata(self.item_path(key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, key: &str) -> StoreResult<StoredItem> {
        self.load(key).await
    }

    async fn write(&self, key: &str, item: WriteItem, overwrite: bool) -> StoreResult<ItemMetadata> {
        validate_series(&item.records)?;

        let existing_created = match self.load(key).await {
            Ok(existing) => {
                if !overwrite {
                    return Err(StoreError::AlreadyExists(key.to_string()));
                }
                Some(existing.metadata.created)
            }
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        let first = item.records[0].timestamp;
        let last = item.records[item.records.len() - 1].timestamp;
        let metadata = ItemMetadata {
            source: item.source,
            interval: item.interval,
            first_record: first,
            last_record: last,
            total_records: item.records.len() as u64,
            gaps: count_gaps(&item.records, item.interval),
            created: existing_created.unwrap_or(now),
            updated: now,
        };

        let stored = StoredItem {
            schema: item.schema,
            data: item.records,
            metadata: metadata.clone(),
        };
        self.persist(key, &stored).await?;
        info!(
            key,
            rows = metadata.total_records,
            gaps = metadata.gaps,
            "series written"
        );
        Ok(metadata)
    }

    async fn append(&self, key: &str, records: Vec<Record>) -> StoreResult<ItemMetadata> {
        if records.is_empty() {
            return Err(StoreError::InvalidData("nothing to append".to_string()));
        }
        let mut item = self.load(key).await?;

        let appended = records.len() as u64;
        item.data.extend(records);
        item.data.sort_by_key(|r| r.timestamp);

        let metadata = &mut item.metadata;
        let first = item.data[0].timestamp;
        let last = item.data[item.data.len() - 1].timestamp;
        if first < metadata.first_record {
            metadata.first_record = first;
        }
        if last > metadata.last_record {
            metadata.last_record = last;
        }
        metadata.total_records += appended;
        metadata.gaps = count_gaps(&item.data, metadata.interval);
        metadata.updated = Utc::now();

        let metadata = item.metadata.clone();
        self.persist(key, &item).await?;
        info!(
            key,
            appended,
            total = metadata.total_records,
            gaps = metadata.gaps,
            "series appended"
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use crate::provider::Schema;
    use tempfile::tempdir;

    const DAY: i64 = 86_400_000;

    fn daily(start: i64, count: usize) -> Vec<Record> {
        (0..count as i64)
            .map(|i| Record::new(start + i * DAY, vec![100.0 + i as f64]))
            .collect()
    }

    fn write_item(records: Vec<Record>) -> WriteItem {
        WriteItem {
            source: "mock".to_string(),
            interval: Interval::Day1,
            schema: Schema::from_fields(&["timestamp", "close"]),
            records,
        }
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let meta = store
            .write("BTC-USDT:1d", write_item(daily(0, 10)), true)
            .await
            .unwrap();
        assert_eq!(meta.first_record, 0);
        assert_eq!(meta.last_record, 9 * DAY);
        assert_eq!(meta.total_records, 10);
        assert_eq!(meta.gaps, 0);

        let item = store.read("BTC-USDT:1d").await.unwrap();
        assert_eq!(item.data.len(), 10);
        assert_eq!(item.schema.fields()[1], "close");
        assert_eq!(item.metadata, meta);
    }

    #[tokio::test]
    async fn test_exists_and_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        assert!(!store.exists("missing").await.unwrap());
        assert!(matches!(
            store.read("missing").await,
            Err(StoreError::NotFound(_))
        ));

        store.write("here", write_item(daily(0, 2)), true).await.unwrap();
        assert!(store.exists("here").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_false_refuses_existing() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        store.write("key", write_item(daily(0, 3)), true).await.unwrap();
        assert!(matches!(
            store.write("key", write_item(daily(0, 5)), false).await,
            Err(StoreError::AlreadyExists(_))
        ));
        // unchanged
        assert_eq!(store.read("key").await.unwrap().data.len(), 3);
    }

    #[tokio::test]
    async fn test_overwrite_preserves_created() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let first = store.write("key", write_item(daily(0, 3)), true).await.unwrap();
        let second = store.write("key", write_item(daily(0, 5)), true).await.unwrap();
        assert_eq!(second.created, first.created);
        assert!(second.updated >= first.updated);
        assert_eq!(second.total_records, 5);
    }

    #[tokio::test]
    async fn test_append_reconciles_both_directions() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let base_start = 100 * DAY;
        store
            .write("key", write_item(daily(base_start, 10)), true)
            .await
            .unwrap();

        // older rows lower first_record, last_record stays put
        let meta = store.append("key", daily(95 * DAY, 5)).await.unwrap();
        assert_eq!(meta.first_record, 95 * DAY);
        assert_eq!(meta.last_record, base_start + 9 * DAY);
        assert_eq!(meta.total_records, 15);

        // newer rows raise last_record, first_record stays put
        let meta = store.append("key", daily(110 * DAY, 3)).await.unwrap();
        assert_eq!(meta.first_record, 95 * DAY);
        assert_eq!(meta.last_record, 112 * DAY);
        assert_eq!(meta.total_records, 18);
        assert_eq!(meta.gaps, 0);

        let item = store.read("key").await.unwrap();
        assert!(item.data.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_append_recounts_gaps() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        store.write("key", write_item(daily(0, 5)), true).await.unwrap();
        // leaves a 3-day hole after day 4
        let meta = store.append("key", daily(8 * DAY, 2)).await.unwrap();
        assert_eq!(meta.gaps, 1);
    }

    #[tokio::test]
    async fn test_append_missing_key() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.append("missing", daily(0, 1)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_unsorted_write() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let mut records = daily(0, 5);
        records.reverse();
        assert!(matches!(
            store.write("key", write_item(records), true).await,
            Err(StoreError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_key_sanitization_keeps_items_apart() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        store.write("BTC-USDT:1d", write_item(daily(0, 2)), true).await.unwrap();
        store.write("ETH-USDT:1d", write_item(daily(0, 3)), true).await.unwrap();

        assert_eq!(store.read("BTC-USDT:1d").await.unwrap().data.len(), 2);
        assert_eq!(store.read("ETH-USDT:1d").await.unwrap().data.len(), 3);
    }
}
