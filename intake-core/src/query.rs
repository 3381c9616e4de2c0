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

//! List filters, pages and aggregate statistics over survey records

use crate::survey::{StoredResponse, SurveyRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Filter for listing survey records.
///
/// `offset` and `limit` apply to the records that pass `since` and `name`,
/// not to the raw store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub limit: usize,
    pub offset: usize,
    /// Inclusive lower bound on `timestamp`
    pub since: u64,
    pub name: Option<String>,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            since: 0,
            name: None,
        }
    }
}

impl ListFilter {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn since(mut self, since: u64) -> Self {
        self.since = since;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn admits(&self, record: &SurveyRecord) -> bool {
        if record.timestamp < self.since {
            return false;
        }
        match &self.name {
            Some(name) => record.name == *name,
            None => true,
        }
    }
}

/// One page of listed records plus the filter that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub entries: Vec<StoredResponse>,
    pub filter: ListFilter,
}

/// Aggregate statistics over every stored survey record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStats {
    pub total: u64,
    pub unique_participants: u64,
    pub time_range: TimeRange,
}

/// Timestamp span of the stored records. Every field is `None` when the store
/// holds no records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub first: Option<u64>,
    pub last: Option<u64>,
    pub duration_ms: Option<u64>,
}

/// Running accumulator for [`SurveyStats`]
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    total: u64,
    names: HashSet<String>,
    first: Option<u64>,
    last: Option<u64>,
}

impl StatsAccumulator {
    pub fn observe(&mut self, record: &SurveyRecord) {
        self.total += 1;
        if !self.names.contains(&record.name) {
            self.names.insert(record.name.clone());
        }
        self.first = Some(self.first.map_or(record.timestamp, |t| t.min(record.timestamp)));
        self.last = Some(self.last.map_or(record.timestamp, |t| t.max(record.timestamp)));
    }

    pub fn finish(self) -> SurveyStats {
        let duration_ms = match (self.first, self.last) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        };

        SurveyStats {
            total: self.total,
            unique_participants: self.names.len() as u64,
            time_range: TimeRange {
                first: self.first,
                last: self.last,
                duration_ms,
            },
        }
    }
}

/// Result of a delete-by-name sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Matching records found at scan time
    pub deleted: usize,
    /// Deletes that were dispatched but reported an error
    pub failed: usize,
}
