//! Strongly-typed identifiers used across the batch.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BatchError;

/// Identifier of a single job execution (log correlation only, never persisted).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Identifier of the task this job processes (the job input).
///
/// Only obtainable through [`crate::JobParameters::validate`], so a `TaskId` is
/// always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Separator between spatial id tokens.
const SID_SEPARATOR: char = '/';

/// Index of the vertical-dimension token in a spatial id.
const VERTICAL_INDEX: usize = 1;

/// Flatten one spatial id: the vertical token is replaced by `"0"`.
///
/// `"region/3/sub/x"` becomes `"region/0/sub/x"`. Trailing empty tokens are
/// dropped before the index is checked, so `"a/"` has a single token and is
/// rejected like `"a"`.
///
/// A malformed id surfaces as an attribute-lookup (retryable) failure.
pub fn flatten_sid(extruded: &str) -> Result<String, BatchError> {
    let mut tokens: Vec<&str> = extruded.split(SID_SEPARATOR).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    match tokens.get_mut(VERTICAL_INDEX) {
        Some(token) => {
            *token = "0";
            Ok(tokens.join("/"))
        }
        None => Err(BatchError::attribute_lookup(format!(
            "Index {VERTICAL_INDEX} out of bounds for length {} (spatial id: {extruded:?})",
            tokens.len()
        ))),
    }
}

/// Flatten every spatial id, failing on the first malformed one.
pub fn flatten_sids<S: AsRef<str>>(extruded: &[S]) -> Result<Vec<String>, BatchError> {
    extruded.iter().map(|s| flatten_sid(s.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RetryClass, Severity};
    use proptest::prelude::*;

    #[test]
    fn flattens_vertical_token() {
        assert_eq!(flatten_sid("region/3/sub/x").unwrap(), "region/0/sub/x");
        assert_eq!(flatten_sid("15/-2/29105/12903").unwrap(), "15/0/29105/12903");
    }

    #[test]
    fn already_flat_is_unchanged() {
        assert_eq!(flatten_sid("a/0/b").unwrap(), "a/0/b");
    }

    #[test]
    fn two_tokens_are_enough() {
        assert_eq!(flatten_sid("a/7").unwrap(), "a/0");
    }

    #[test]
    fn trailing_empty_tokens_are_dropped() {
        assert_eq!(flatten_sid("a/3/b/").unwrap(), "a/0/b");
        assert!(flatten_sid("a/").is_err());
        assert!(flatten_sid("a//").is_err());
    }

    // Known-suspicious classification: a malformed id will not become valid on
    // retry, yet it is reported as a retryable generic failure. Kept as-is until
    // product intent says otherwise.
    #[test]
    fn malformed_sid_is_classified_retryable_generic() {
        let err = flatten_sid("no-separator").unwrap_err();
        assert!(matches!(err, BatchError::AttributeLookup(_)));
        assert_eq!(err.retry_class(), RetryClass::Retryable);
        assert_eq!(err.severity(), Severity::Generic);
        assert!(err.log_detail().contains("no-separator"));
    }

    #[test]
    fn empty_sid_is_malformed() {
        assert!(flatten_sid("").is_err());
    }

    #[test]
    fn flatten_many_stops_at_first_malformed() {
        let ok = flatten_sids(&["a/1/b", "c/2/d"]).unwrap();
        assert_eq!(ok, vec!["a/0/b", "c/0/d"]);

        let err = flatten_sids(&["a/1/b", "bad", "c/2/d"]).unwrap_err();
        assert!(err.log_detail().contains("bad"));
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn run_id_round_trips_through_display() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    fn token() -> impl Strategy<Value = String> {
        "[a-z0-9-]{1,6}"
    }

    proptest! {
        #[test]
        fn flatten_is_idempotent(tokens in prop::collection::vec(token(), 2..8)) {
            let sid = tokens.join("/");
            let once = flatten_sid(&sid).unwrap();
            let twice = flatten_sid(&once).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn flatten_only_touches_vertical_token(tokens in prop::collection::vec(token(), 2..8)) {
            let sid = tokens.join("/");
            let flat = flatten_sid(&sid).unwrap();
            let out: Vec<&str> = flat.split('/').collect();
            prop_assert_eq!(out.len(), tokens.len());
            prop_assert_eq!(out[1], "0");
            for (i, t) in tokens.iter().enumerate().filter(|(i, _)| *i != 1) {
                prop_assert_eq!(out[i], t.as_str());
            }
        }
    }
}
