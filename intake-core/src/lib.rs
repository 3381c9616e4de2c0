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

//! Intake Core
//!
//! Domain types shared by the storage and server crates:
//!
//! - **Survey records**: one onboarding submission with its fixed answer shape
//! - **Store keys**: the `(responses, timestamp, name)` tuple that orders records
//! - **Queries**: list filters, pages and aggregate statistics
//! - **Clock**: injectable millisecond time source

pub mod clock;
pub mod error;
pub mod query;
pub mod survey;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{IntakeError, Result};
pub use query::{
    DeleteOutcome, ListFilter, ListPage, StatsAccumulator, SurveyStats, TimeRange,
    DEFAULT_LIST_LIMIT,
};
pub use survey::{StoreKey, StoredResponse, SurveyAnswers, SurveyRecord, RESPONSES_NAMESPACE};
