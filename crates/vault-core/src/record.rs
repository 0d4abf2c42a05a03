use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const ID_FIELD: &str = "id";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Schema-flexible record: string keys to string values, in insertion order.
///
/// Every value held in `fields` is a `Value::String`. Non-string JSON input is
/// coerced on the way in so callers only ever see `&str`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    pub fn from_json_map(map: Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .map(|(key, value)| (key, Value::String(coerce_to_string(value))))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields
            .insert(key.into(), Value::String(value.into()))
            .map(coerce_to_string)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.shift_remove(key).map(coerce_to_string)
    }

    /// The record id, if present and not blank.
    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).filter(|id| !id.trim().is_empty())
    }

    /// Assigns a fresh id when the record has none and returns the id in effect.
    pub fn ensure_id(&mut self) -> String {
        if let Some(id) = self.id() {
            return id.to_string();
        }
        let id = generate_id();
        self.insert(ID_FIELD, id.clone());
        id
    }

    /// Shallow overwrite: every field of `patch` replaces or extends `self`.
    pub fn merge(&mut self, patch: &Record) {
        for (key, value) in patch.iter() {
            self.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str().unwrap_or_default()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Record::from_json_map(map))
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn coerce_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_values_are_coerced_to_strings() {
        let record: Record = serde_json::from_value(json!({
            "issuer_name": "Alpha",
            "coupon_rate": 7.25,
            "listed": true,
            "notes": null,
        }))
        .expect("record");
        assert_eq!(record.get("coupon_rate"), Some("7.25"));
        assert_eq!(record.get("listed"), Some("true"));
        assert_eq!(record.get("notes"), Some(""));
    }

    #[test]
    fn field_order_follows_insertion() {
        let record: Record = [("zeta", "1"), ("alpha", "2"), ("mid", "3")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn blank_id_is_replaced() {
        let mut record: Record = [("id", "  "), ("isin", "IN001")].into_iter().collect();
        let id = record.ensure_id();
        assert!(!id.trim().is_empty());
        assert_eq!(record.id(), Some(id.as_str()));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let result: Result<Record, _> = serde_json::from_value(json!(["a", "b"]));
        assert!(result.is_err());
    }
}
