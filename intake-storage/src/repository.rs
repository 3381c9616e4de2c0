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

//! Survey repository: validation, listing, statistics and deletion over the
//! ordered store.
//!
//! Listing relies on key order alone. Keys sort by timestamp first, so a
//! prefix scan already yields records oldest first and `since` needs no
//! secondary index. Statistics and delete-by-name always walk the whole
//! prefix; their counts are exact for the scan but not isolated from
//! concurrent writers.

use crate::adapter::StoreAdapter;
use futures::future::join_all;
use futures::StreamExt;
use intake_core::{
    Clock, DeleteOutcome, ListFilter, ListPage, Result, StatsAccumulator, StoreKey, SurveyAnswers,
    SurveyRecord, SurveyStats, SystemClock,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SurveyRepository {
    store: StoreAdapter,
    clock: Arc<dyn Clock>,
}

impl SurveyRepository {
    pub fn new(store: StoreAdapter, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: StoreAdapter) -> Self {
        Self::new(store, Arc::new(SystemClock::new()))
    }

    pub fn store(&self) -> &StoreAdapter {
        &self.store
    }

    /// Validate `answers` and persist one new record stamped with the current
    /// time. Nothing is stored when validation fails.
    pub async fn write(&self, name: &str, answers: Option<&Value>) -> Result<SurveyRecord> {
        let answers = SurveyAnswers::from_value(answers)?;
        let record = SurveyRecord::new(name, self.clock.now_ms(), answers);

        self.store.put(&record.key(), &record).await?;
        debug!(name = %record.name, timestamp = record.timestamp, "Stored survey response");

        Ok(record)
    }

    /// List records oldest first.
    ///
    /// `offset` skips records that passed the filter, then up to `limit`
    /// records are collected and the scan stops.
    pub async fn list(&self, filter: ListFilter) -> Result<ListPage> {
        let mut entries = Vec::with_capacity(filter.limit.min(1024));
        if filter.limit == 0 {
            return Ok(ListPage { entries, filter });
        }

        let mut skipped = 0;
        let mut scan = self.store.scan_responses();
        while let Some(entry) = scan.next().await {
            let entry = entry?;
            if !filter.admits(&entry.record) {
                continue;
            }
            if skipped < filter.offset {
                skipped += 1;
                continue;
            }

            entries.push(entry);
            if entries.len() >= filter.limit {
                break;
            }
        }

        Ok(ListPage { entries, filter })
    }

    /// Aggregate over every stored record
    pub async fn stats(&self) -> Result<SurveyStats> {
        let mut acc = StatsAccumulator::default();
        let mut scan = self.store.scan_responses();
        while let Some(entry) = scan.next().await {
            acc.observe(&entry?.record);
        }

        Ok(acc.finish())
    }

    /// Delete every record stored under `name`.
    ///
    /// Deletes are dispatched concurrently and are not transactional. The
    /// reported `deleted` count is the number of matches found by the scan,
    /// even if some of the deletes fail; those are logged and counted in
    /// `failed`.
    pub async fn delete_by_name(&self, name: &str) -> Result<DeleteOutcome> {
        let mut keys: Vec<StoreKey> = Vec::new();
        let mut scan = self.store.scan_responses();
        while let Some(entry) = scan.next().await {
            let entry = entry?;
            if entry.record.name == name {
                keys.push(entry.key);
            }
        }

        let results = join_all(keys.iter().map(|key| self.store.delete(key))).await;

        let mut failed = 0;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                warn!(key = %key.encode(), error = %e, "Failed to delete survey response");
            }
        }

        info!(name = %name, deleted = keys.len(), failed, "Deleted survey responses");

        Ok(DeleteOutcome {
            deleted: keys.len(),
            failed,
        })
    }
}
