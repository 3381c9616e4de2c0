// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Sorted key-value backends

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use intake_core::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

pub type KvPair = (Vec<u8>, Vec<u8>);

/// A sorted key-value store.
///
/// Batches of puts or deletes carry no transactional guarantee.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Lazily iterate every entry whose key starts with `prefix`, in
    /// ascending byte order of the full key. Dropping the stream stops the scan.
    fn scan_prefix(&self, prefix: &[u8]) -> BoxStream<'static, Result<KvPair>>;

    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// Make prior writes durable. A no-op for volatile backends.
    async fn flush(&self) -> Result<()>;

    fn name(&self) -> &str;
}

/// In-memory backend over a `BTreeMap`
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> BoxStream<'static, Result<KvPair>> {
        let entries = self.entries.clone();
        let prefix = prefix.to_vec();
        let start = Bound::Included(prefix.clone());

        // Cursor scan: the lock is held for one lookup at a time, so writers
        // interleave with a long scan and an early stop leaves the rest unread.
        stream::unfold(Some(start), move |cursor| {
            let entries = entries.clone();
            let prefix = prefix.clone();
            async move {
                let lower = cursor?;
                let next = {
                    let map = entries.read();
                    map.range::<Vec<u8>, _>((lower, Bound::Unbounded))
                        .next()
                        .filter(|(key, _)| key.starts_with(&prefix))
                        .map(|(key, value)| (key.clone(), value.clone()))
                };
                next.map(|(key, value)| {
                    let cursor = Some(Bound::Excluded(key.clone()));
                    (Ok((key, value)), cursor)
                })
            }
        })
        .boxed()
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_prefix_scan_is_ordered_and_bounded() {
        let backend = MemoryBackend::new();
        backend.put(b"b/2", b"two".to_vec()).await.unwrap();
        backend.put(b"a/9", b"other".to_vec()).await.unwrap();
        backend.put(b"b/1", b"one".to_vec()).await.unwrap();
        backend.put(b"c/0", b"other".to_vec()).await.unwrap();

        let pairs: Vec<KvPair> = backend.scan_prefix(b"b/").try_collect().await.unwrap();
        assert_eq!(
            pairs,
            vec![
                (b"b/1".to_vec(), b"one".to_vec()),
                (b"b/2".to_vec(), b"two".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_tolerates_concurrent_writes() {
        let backend = MemoryBackend::new();
        backend.put(b"k/1", vec![1]).await.unwrap();
        backend.put(b"k/3", vec![3]).await.unwrap();

        let mut scan = backend.scan_prefix(b"k/");
        let first = scan.next().await.unwrap().unwrap();
        assert_eq!(first.0, b"k/1".to_vec());

        // Written behind the cursor: skipped. Written ahead: seen.
        backend.put(b"k/0", vec![0]).await.unwrap();
        backend.put(b"k/2", vec![2]).await.unwrap();
        backend.delete(b"k/3").await.unwrap();

        let rest: Vec<KvPair> = scan.try_collect().await.unwrap();
        assert_eq!(rest, vec![(b"k/2".to_vec(), vec![2])]);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let backend = MemoryBackend::new();
        backend.delete(b"nothing").await.unwrap();
        assert!(backend.is_empty());
    }
}
