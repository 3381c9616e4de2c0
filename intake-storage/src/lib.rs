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

//! Intake Storage Layer
//!
//! Ordered key-value persistence for onboarding survey responses.
//!
//! ## Architecture
//!
//! - **Backends** ([`KvBackend`]): sorted byte-keyed stores with lazy prefix
//!   scans. [`SledBackend`] persists to disk, [`MemoryBackend`] keeps a
//!   `BTreeMap` for tests and ephemeral deployments.
//! - **Store adapter** ([`StoreAdapter`]): typed put/scan/delete over
//!   [`StoreKey`](intake_core::StoreKey) and [`SurveyRecord`](intake_core::SurveyRecord).
//! - **Repository** ([`SurveyRepository`]): validation, filtering,
//!   pagination, delete-by-name and statistics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use intake_storage::{StoreAdapter, SurveyRepository};
//!
//! let repository = SurveyRepository::with_system_clock(StoreAdapter::in_memory());
//! repository.write("alice", Some(&serde_json::json!({ "teachLLMs": "yes" }))).await?;
//! ```

pub mod adapter;
pub mod backend;
pub mod repository;
pub mod sled_backend;

pub use adapter::StoreAdapter;
pub use backend::{KvBackend, KvPair, MemoryBackend};
pub use repository::SurveyRepository;
pub use sled_backend::SledBackend;
