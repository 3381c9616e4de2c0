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

//! On-disk backend over a sled tree

use crate::backend::{KvBackend, KvPair};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use intake_core::{IntakeError, Result};
use std::ops::Bound;
use std::path::Path;
use tracing::{debug, info};

/// Entries read per blocking scan step
const SCAN_BATCH: usize = 256;

/// Persistent sorted store. Keys are compared as raw bytes.
#[derive(Clone)]
pub struct SledBackend {
    db: sled::Db,
}

fn storage_error(op: &str, e: sled::Error) -> IntakeError {
    IntakeError::Storage(format!("sled {} failed: {}", op, e))
}

/// Read up to `SCAN_BATCH` entries under `prefix`, starting at `lower`
fn read_batch(db: &sled::Db, prefix: &[u8], lower: Bound<Vec<u8>>) -> Result<Vec<KvPair>> {
    let mut batch = Vec::with_capacity(SCAN_BATCH);
    for item in db.range((lower, Bound::<Vec<u8>>::Unbounded)) {
        let (key, value) = item.map_err(|e| storage_error("scan", e))?;
        if !key.starts_with(prefix) {
            break;
        }
        batch.push((key.to_vec(), value.to_vec()));
        if batch.len() == SCAN_BATCH {
            break;
        }
    }
    Ok(batch)
}

impl SledBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening sled store at: {:?}", path);
        let db = sled::open(path).map_err(|e| storage_error("open", e))?;
        Ok(Self { db })
    }

    /// A store that is removed when the last handle is dropped
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| storage_error("open", e))?;
        Ok(Self { db })
    }
}

#[async_trait]
impl KvBackend for SledBackend {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.db
            .insert(key, value)
            .map_err(|e| storage_error("insert", e))?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> BoxStream<'static, Result<KvPair>> {
        let db = self.db.clone();
        let prefix = prefix.to_vec();
        let start = Bound::Included(prefix.clone());

        // Page reads block, so each batch is read on the blocking pool.
        stream::unfold(Some(start), move |cursor| {
            let db = db.clone();
            let prefix = prefix.clone();
            async move {
                let lower = cursor?;
                let read = tokio::task::spawn_blocking(move || read_batch(&db, &prefix, lower))
                    .await
                    .map_err(|e| IntakeError::Storage(format!("sled scan task failed: {}", e)))
                    .and_then(|batch| batch);

                let batch = match read {
                    Ok(batch) if batch.is_empty() => return None,
                    Ok(batch) => batch,
                    Err(e) => return Some((stream::iter(vec![Err(e)]), None)),
                };
                let next = match batch.last() {
                    Some((key, _)) if batch.len() == SCAN_BATCH => {
                        Some(Bound::Excluded(key.clone()))
                    }
                    _ => None,
                };
                let items: Vec<Result<KvPair>> = batch.into_iter().map(Ok).collect();
                Some((stream::iter(items), next))
            }
        })
        .flatten()
        .boxed()
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .remove(key)
            .map_err(|e| storage_error("remove", e))?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let bytes = self
            .db
            .flush_async()
            .await
            .map_err(|e| storage_error("flush", e))?;
        debug!(bytes, "Flushed sled store");
        Ok(())
    }

    fn name(&self) -> &str {
        "sled"
    }
}
