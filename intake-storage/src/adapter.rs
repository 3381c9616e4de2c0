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

//! Typed store adapter over a sorted key-value backend

use crate::backend::{KvBackend, MemoryBackend};
use futures::stream::{BoxStream, StreamExt};
use intake_core::{IntakeError, Result, StoreKey, StoredResponse, SurveyRecord};
use std::sync::Arc;

/// Put, prefix-scan and delete survey records keyed by [`StoreKey`].
///
/// Values are stored as JSON. Every decoded record is checked against the key
/// it was read from; a mismatch is reported as a storage error.
#[derive(Clone)]
pub struct StoreAdapter {
    backend: Arc<dyn KvBackend>,
}

impl StoreAdapter {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn put(&self, key: &StoreKey, record: &SurveyRecord) -> Result<()> {
        if record.timestamp != key.timestamp || record.name != key.name {
            return Err(IntakeError::Storage(format!(
                "record ({}, {}) does not match key {}",
                record.timestamp,
                record.name,
                key.encode()
            )));
        }

        let value = serde_json::to_vec(record)?;
        self.backend.put(key.encode().as_bytes(), value).await
    }

    /// Lazily scan records whose encoded key starts with `prefix`, in
    /// ascending key order
    pub fn scan_prefix(&self, prefix: &str) -> BoxStream<'static, Result<StoredResponse>> {
        self.backend
            .scan_prefix(prefix.as_bytes())
            .map(|item| item.and_then(|(key, value)| decode_entry(&key, &value)))
            .boxed()
    }

    /// Scan every survey record, oldest first
    pub fn scan_responses(&self) -> BoxStream<'static, Result<StoredResponse>> {
        self.scan_prefix(&StoreKey::prefix())
    }

    pub async fn delete(&self, key: &StoreKey) -> Result<()> {
        self.backend.delete(key.encode().as_bytes()).await
    }

    pub async fn close(&self) -> Result<()> {
        self.backend.flush().await
    }
}

fn decode_entry(raw_key: &[u8], raw_value: &[u8]) -> Result<StoredResponse> {
    let key = StoreKey::decode(raw_key).ok_or_else(|| {
        IntakeError::Storage(format!(
            "malformed store key: {}",
            String::from_utf8_lossy(raw_key)
        ))
    })?;

    let record: SurveyRecord = serde_json::from_slice(raw_value).map_err(|e| {
        IntakeError::Storage(format!("corrupt record at {}: {}", key.encode(), e))
    })?;

    if record.key() != key {
        return Err(IntakeError::Storage(format!(
            "record at {} has drifted from its key",
            key.encode()
        )));
    }

    Ok(StoredResponse { key, record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use intake_core::SurveyAnswers;

    fn record(name: &str, timestamp: u64) -> SurveyRecord {
        SurveyRecord::new(name, timestamp, SurveyAnswers::new("t", "s"))
    }

    #[tokio::test]
    async fn test_scan_orders_by_timestamp_then_name() {
        let store = StoreAdapter::in_memory();
        for r in [record("zed", 5), record("amy", 20), record("bob", 5), record("amy", 3)] {
            store.put(&r.key(), &r).await.unwrap();
        }

        let keys: Vec<StoreKey> = store
            .scan_responses()
            .map_ok(|entry| entry.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            keys,
            vec![
                StoreKey::new(3, "amy"),
                StoreKey::new(5, "bob"),
                StoreKey::new(5, "zed"),
                StoreKey::new(20, "amy"),
            ]
        );
    }

    #[tokio::test]
    async fn test_same_key_last_write_wins() {
        let store = StoreAdapter::in_memory();
        let first = record("amy", 7);
        let mut second = record("amy", 7);
        second.answers.teach_llms = "updated".to_string();

        store.put(&first.key(), &first).await.unwrap();
        store.put(&second.key(), &second).await.unwrap();

        let entries: Vec<StoredResponse> = store.scan_responses().try_collect().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.answers.teach_llms, "updated");
    }

    #[tokio::test]
    async fn test_put_rejects_mismatched_key() {
        let store = StoreAdapter::in_memory();
        let r = record("amy", 7);
        let err = store.put(&StoreKey::new(8, "amy"), &r).await.unwrap_err();
        assert!(matches!(err, IntakeError::Storage(_)));
    }

    #[tokio::test]
    async fn test_corrupt_value_surfaces_as_storage_error() {
        let backend = Arc::new(MemoryBackend::new());
        let key = StoreKey::new(1, "amy");
        backend
            .put(key.encode().as_bytes(), b"not json".to_vec())
            .await
            .unwrap();

        let store = StoreAdapter::new(backend);
        let result: Result<Vec<StoredResponse>> = store.scan_responses().try_collect().await;
        assert!(matches!(result, Err(IntakeError::Storage(_))));
    }
}
