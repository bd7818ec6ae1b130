//! Metering samples as they arrive from the telemetry pipeline.
//!
//! A sample is kept as the JSON object it arrived as. The signature covers
//! every field, including ones this crate has no use for, so nothing is
//! dropped on the way in.

use serde_json::{Map, Number, Value};
use std::fmt;

/// Name of the field carrying a sample's HMAC.
pub const SIGNATURE_FIELD: &str = "message_signature";

/// One metering data point: identity, value and integrity signature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample {
    fields: Map<String, Value>,
}

/// Either one sample or an ordered batch of them.
///
/// Producers may put a lone sample on the wire rather than a one-element
/// list. Both deserialize into a `Payload`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// A single sample.
    One(Sample),
    /// An ordered batch of samples.
    Many(Vec<Sample>),
}

impl Payload {
    /// Flatten into samples, preserving order.
    pub fn into_samples(self) -> Vec<Sample> {
        match self {
            Payload::One(sample) => vec![sample],
            Payload::Many(samples) => samples,
        }
    }
}

impl From<Sample> for Payload {
    fn from(sample: Sample) -> Payload {
        Payload::One(sample)
    }
}

impl From<Vec<Sample>> for Payload {
    fn from(samples: Vec<Sample>) -> Payload {
        Payload::Many(samples)
    }
}

impl Sample {
    /// Create an empty sample.
    pub fn new() -> Sample {
        Sample::default()
    }

    /// Set `key` to `value`, returning the sample for chaining.
    pub fn field<S, V>(mut self, key: S, value: V) -> Sample
    where
        S: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set `key` to `value` in place.
    pub fn insert<S, V>(&mut self, key: S, value: V)
    where
        S: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
    }

    /// Look up a raw field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields, ordered by key.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The counter name, when present as a string.
    pub fn counter_name(&self) -> Option<&str> {
        self.get("counter_name").and_then(Value::as_str)
    }

    /// The resource id, when present as a string.
    pub fn resource_id(&self) -> Option<&str> {
        self.get("resource_id").and_then(Value::as_str)
    }

    /// The raw volume field, numeric or not.
    pub fn counter_volume(&self) -> Option<&Value> {
        self.get("counter_volume")
    }

    /// The volume, when it is a number.
    pub fn volume(&self) -> Option<&Number> {
        match self.counter_volume() {
            Some(&Value::Number(ref n)) => Some(n),
            _ => None,
        }
    }

    /// The raw timestamp field.
    pub fn timestamp(&self) -> Option<&Value> {
        self.get("timestamp")
    }

    /// The signature carried by the sample, if any.
    pub fn signature(&self) -> Option<&str> {
        self.get(SIGNATURE_FIELD).and_then(Value::as_str)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json;

    #[test]
    fn test_single_object_is_one() {
        let payload: Payload = serde_json::from_str(
            r#"{"counter_name": "cpu", "resource_id": "r1", "counter_volume": 1}"#,
        ).unwrap();
        let samples = payload.into_samples();
        assert_eq!(1, samples.len());
        assert_eq!(Some("cpu"), samples[0].counter_name());
        assert_eq!(Some("r1"), samples[0].resource_id());
    }

    #[test]
    fn test_array_is_many_and_ordered() {
        let payload: Payload = serde_json::from_str(
            r#"[{"counter_name": "a"}, {"counter_name": "b"}, {"counter_name": "c"}]"#,
        ).unwrap();
        let names: Vec<String> = payload
            .into_samples()
            .iter()
            .map(|s| s.counter_name().unwrap().to_string())
            .collect();
        assert_eq!(vec!["a", "b", "c"], names);
    }

    #[test]
    fn test_one_equals_singleton_many() {
        let sample = Sample::new().field("counter_name", "cpu");
        assert_eq!(
            Payload::from(sample.clone()).into_samples(),
            Payload::from(vec![sample]).into_samples()
        );
    }

    #[test]
    fn test_volume_must_be_numeric() {
        let s = Sample::new().field("counter_volume", "12");
        assert!(s.counter_volume().is_some());
        assert!(s.volume().is_none());

        let s = Sample::new().field("counter_volume", 12.5);
        assert_eq!(Some(12.5), s.volume().and_then(|n| n.as_f64()));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let raw = r#"{"counter_name":"cpu","project_id":"p","resource_metadata":{"a":1}}"#;
        let sample: Sample = serde_json::from_str(raw).unwrap();
        assert_eq!(Some(&json!("p")), sample.get("project_id"));
        assert_eq!(Some(&json!({"a": 1})), sample.get("resource_metadata"));
    }
}
