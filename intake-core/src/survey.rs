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

//! Survey records and their ordered store keys

use crate::error::{IntakeError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// First component of every survey store key
pub const RESPONSES_NAMESPACE: &str = "responses";

/// Answer field names as they appear on the wire
const TEACH_LLMS_FIELD: &str = "teachLLMs";
const SYNTHETIC_STUDENTS_FIELD: &str = "syntheticStudents";

/// The two free-text onboarding answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswers {
    #[serde(rename = "teachLLMs", default)]
    pub teach_llms: String,
    #[serde(rename = "syntheticStudents", default)]
    pub synthetic_students: String,
}

impl SurveyAnswers {
    pub fn new(teach_llms: impl Into<String>, synthetic_students: impl Into<String>) -> Self {
        Self {
            teach_llms: teach_llms.into(),
            synthetic_students: synthetic_students.into(),
        }
    }

    /// Validate an untyped answers payload.
    ///
    /// The payload must be a JSON object. Each recognized field may be absent
    /// or `null` (stored as an empty string) or a string. Unrecognized fields
    /// are ignored.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        let fields = match value {
            Some(Value::Object(fields)) => fields,
            Some(other) => {
                return Err(IntakeError::Validation(format!(
                    "answers must be an object, got {}",
                    json_type(other)
                )))
            }
            None => return Err(IntakeError::Validation("answers are missing".to_string())),
        };

        Ok(Self {
            teach_llms: text_field(fields, TEACH_LLMS_FIELD)?,
            synthetic_students: text_field(fields, SYNTHETIC_STUDENTS_FIELD)?,
        })
    }
}

fn text_field(fields: &Map<String, Value>, field: &str) -> Result<String> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(IntakeError::Validation(format!(
            "{} must be a string, got {}",
            field,
            json_type(other)
        ))),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One onboarding submission. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub name: String,
    /// Milliseconds since the Unix epoch, assigned by the server at write time
    pub timestamp: u64,
    #[serde(rename = "responses")]
    pub answers: SurveyAnswers,
}

impl SurveyRecord {
    pub fn new(name: impl Into<String>, timestamp: u64, answers: SurveyAnswers) -> Self {
        Self {
            name: name.into(),
            timestamp,
            answers,
        }
    }

    /// The only key this record may be stored under
    pub fn key(&self) -> StoreKey {
        StoreKey::new(self.timestamp, self.name.clone())
    }
}

/// Composite key `(responses, timestamp, name)`.
///
/// Encoded as `responses/{timestamp:020}/{name}`. The timestamp is zero padded
/// to the full width of a `u64`, so byte order of encoded keys is ascending
/// timestamp first and name second, the same order as the derived `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub timestamp: u64,
    pub name: String,
}

impl StoreKey {
    pub fn new(timestamp: u64, name: impl Into<String>) -> Self {
        Self {
            timestamp,
            name: name.into(),
        }
    }

    /// Prefix shared by every survey key
    pub fn prefix() -> String {
        format!("{}/", RESPONSES_NAMESPACE)
    }

    pub fn encode(&self) -> String {
        format!("{}/{:020}/{}", RESPONSES_NAMESPACE, self.timestamp, self.name)
    }

    pub fn decode(raw: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?;
        let rest = text.strip_prefix(RESPONSES_NAMESPACE)?.strip_prefix('/')?;
        let (timestamp, name) = rest.split_once('/')?;
        if timestamp.len() != 20 || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            timestamp: timestamp.parse().ok()?,
            name: name.to_string(),
        })
    }
}

// Rendered to callers as the raw tuple `["responses", timestamp, name]`.
impl Serialize for StoreKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (RESPONSES_NAMESPACE, self.timestamp, &self.name).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StoreKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (namespace, timestamp, name) = <(String, u64, String)>::deserialize(deserializer)?;
        if namespace != RESPONSES_NAMESPACE {
            return Err(serde::de::Error::custom(format!(
                "unexpected key namespace: {}",
                namespace
            )));
        }
        Ok(Self { timestamp, name })
    }
}

/// A record together with the raw key it was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: StoreKey,
    #[serde(flatten)]
    pub record: SurveyRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_answers_default_missing_fields() {
        let answers = SurveyAnswers::from_value(Some(&json!({}))).unwrap();
        assert_eq!(answers, SurveyAnswers::default());

        let answers =
            SurveyAnswers::from_value(Some(&json!({ "teachLLMs": "yes", "syntheticStudents": null })))
                .unwrap();
        assert_eq!(answers.teach_llms, "yes");
        assert_eq!(answers.synthetic_students, "");
    }

    #[test]
    fn test_answers_reject_non_objects() {
        assert!(SurveyAnswers::from_value(None).unwrap_err().is_validation());
        assert!(SurveyAnswers::from_value(Some(&Value::Null)).unwrap_err().is_validation());
        assert!(SurveyAnswers::from_value(Some(&json!("text"))).unwrap_err().is_validation());
        assert!(SurveyAnswers::from_value(Some(&json!([1, 2]))).unwrap_err().is_validation());
        assert!(SurveyAnswers::from_value(Some(&json!({ "teachLLMs": 3 })))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_key_encoding() {
        let key = StoreKey::new(1704067200000, "alice");
        assert_eq!(key.encode(), "responses/00000001704067200000/alice");
        assert!(key.encode().starts_with(&StoreKey::prefix()));
        assert_eq!(StoreKey::decode(key.encode().as_bytes()), Some(key));
    }

    #[test]
    fn test_key_decode_keeps_slashes_in_name() {
        let key = StoreKey::new(42, "team/alice");
        assert_eq!(StoreKey::decode(key.encode().as_bytes()), Some(key));
        assert_eq!(StoreKey::decode(b"responses/42/alice"), None);
        assert_eq!(StoreKey::decode(b"other/00000000000000000042/alice"), None);
    }

    #[test]
    fn test_stored_response_shape() {
        let record = SurveyRecord::new("bob", 7, SurveyAnswers::new("a", "b"));
        let stored = StoredResponse {
            key: record.key(),
            record,
        };
        assert_eq!(
            serde_json::to_value(&stored).unwrap(),
            json!({
                "key": ["responses", 7, "bob"],
                "name": "bob",
                "timestamp": 7,
                "responses": { "teachLLMs": "a", "syntheticStudents": "b" }
            })
        );
    }

    proptest! {
        #[test]
        fn prop_encoded_order_matches_key_order(
            a_ts in any::<u64>(), a_name in "[a-z/]{0,8}",
            b_ts in any::<u64>(), b_name in "[a-z/]{0,8}",
        ) {
            let a = StoreKey::new(a_ts, a_name);
            let b = StoreKey::new(b_ts, b_name);
            if a.timestamp != b.timestamp {
                prop_assert_eq!(a.encode().cmp(&b.encode()), a.timestamp.cmp(&b.timestamp));
            } else {
                prop_assert_eq!(a.encode().cmp(&b.encode()), a.cmp(&b));
            }
        }
    }
}
