//! Immutable context snapshots.

use crate::errors::AchflowError;
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// An immutable, ordered view of a run's context.
///
/// Serializes as a JSON object whose keys follow execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    entries: Vec<(String, Value)>,
}

impl ContextSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot from ordered entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Gets a string value by key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Deserializes the value under `key` into `T`.
    pub fn parse<T: DeserializeOwned>(&self, key: &str) -> Result<T, AchflowError> {
        let value = self.get(key).ok_or_else(|| {
            AchflowError::Serialization(format!("context has no value for '{key}'"))
        })?;
        serde_json::from_value(value.clone())
            .map_err(|e| AchflowError::Serialization(format!("context key '{key}': {e}")))
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the keys in execution order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Iterates the entries in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ContextSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = ContextSnapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of context keys to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            entries.push((key, value));
        }
        Ok(ContextSnapshot { entries })
    }
}

impl<'de> Deserialize<'de> for ContextSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SnapshotVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> ContextSnapshot {
        ContextSnapshot::from_entries([
            ("user_request".to_string(), json!("Will it rain?")),
            ("hypotheses".to_string(), json!({"hypotheses": ["yes", "no"], "reasoning": "r"})),
        ])
    }

    #[test]
    fn test_lookup() {
        let snapshot = sample();
        assert_eq!(snapshot.get_str("user_request"), Some("Will it rain?"));
        assert_eq!(snapshot.get_str("hypotheses"), None);
        assert!(snapshot.contains_key("hypotheses"));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_parse_typed_value() {
        #[derive(Deserialize)]
        struct Hypotheses {
            hypotheses: Vec<String>,
        }

        let parsed: Hypotheses = sample().parse("hypotheses").unwrap();
        assert_eq!(parsed.hypotheses, vec!["yes", "no"]);
        assert!(sample().parse::<Hypotheses>("missing").is_err());
    }

    #[test]
    fn test_serialization_preserves_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.starts_with(r#"{"user_request":"#));

        let back: ContextSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }
}
