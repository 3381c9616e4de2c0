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

//! Error taxonomy shared across the intake crates

use thiserror::Error;

/// Result type for intake operations
pub type Result<T> = std::result::Result<T, IntakeError>;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// Malformed caller input. Nothing was stored or attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Key-value store unavailable or an operation on it failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote completion API failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl IntakeError {
    pub fn is_validation(&self) -> bool {
        matches!(self, IntakeError::Validation(_))
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(e: serde_json::Error) -> Self {
        IntakeError::Serialization(e.to_string())
    }
}
