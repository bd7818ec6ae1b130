//! Per-host hardware inspectors and the parameters that drive them.
//!
//! An inspector answers "what does OID X read on host H", returning one
//! `RawReading` per interface, disk or whatever else the OID enumerates.
//! Concrete protocol inspectors live outside this crate; `Aggregate` wraps any
//! of them.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::str::FromStr;
use url::Url;

mod aggregate;

pub use self::aggregate::Aggregate;

/// Free-form key/value metadata attached to a reading.
pub type Metadata = Map<String, Value>;

/// One inspector-reported value with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    /// The reported value.
    pub value: f64,
    /// Per-reading metadata. Inspectors put the interface or device name
    /// under `name`.
    pub metadata: Metadata,
    /// Metadata applied to the sample built from this reading.
    pub extra_metadata: Metadata,
}

impl RawReading {
    /// Build a reading.
    pub fn new(value: f64, metadata: Metadata, extra_metadata: Metadata) -> RawReading {
        RawReading {
            value: value,
            metadata: metadata,
            extra_metadata: extra_metadata,
        }
    }

    /// The `name` metadata, when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(Value::as_str)
    }
}

/// How a raw value read from an OID is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Truncate toward zero.
    Int,
    /// Leave as a float.
    Float,
}

impl Coercion {
    /// Convert `value`.
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Coercion::Int => value.trunc(),
            Coercion::Float => value,
        }
    }
}

impl FromStr for Coercion {
    type Err = InspectorError;

    fn from_str(s: &str) -> Result<Coercion, InspectorError> {
        match s {
            "int" => Ok(Coercion::Int),
            "float" => Ok(Coercion::Float),
            other => Err(InspectorError::UnsupportedType(other.to_string())),
        }
    }
}

/// An OID paired with the conversion applied to what it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Oid {
    /// Dotted OID string.
    pub oid: String,
    /// Conversion for values read from `oid`.
    pub coercion: Coercion,
}

impl Oid {
    /// Pair `oid` with `coercion`.
    pub fn new<S: Into<String>>(oid: S, coercion: Coercion) -> Oid {
        Oid {
            oid: oid.into(),
            coercion: coercion,
        }
    }
}

/// Operator-supplied parameters for one meter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeterParam {
    /// The OID whose subtree is read.
    pub oid: String,
    /// Name of the value conversion, `int` or `float`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// A second OID in the same counter family, read under the same filter.
    #[serde(default)]
    pub oid_extra: Option<String>,
    /// Tag selecting post-aggregation scaling, e.g. `network`.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Metadata OIDs, keyed by metadata name.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl MeterParam {
    /// A parameter reading `oid` with values of type `type_name`.
    pub fn new<S, T>(oid: S, type_name: T) -> MeterParam
    where
        S: Into<String>,
        T: Into<String>,
    {
        MeterParam {
            oid: oid.into(),
            type_name: type_name.into(),
            oid_extra: None,
            identifier: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the extra OID.
    pub fn oid_extra<S: Into<String>>(mut self, oid: S) -> MeterParam {
        self.oid_extra = Some(oid.into());
        self
    }

    /// Set the identifier tag.
    pub fn identifier<S: Into<String>>(mut self, identifier: S) -> MeterParam {
        self.identifier = Some(identifier.into());
        self
    }
}

/// Parameters after an inspector has prepared them for querying.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedParam {
    /// The OID queried, with its conversion.
    pub metric_oid: Oid,
    /// Metadata OIDs, each with its conversion.
    pub metadata: HashMap<String, Oid>,
    /// The parsed extra OID, if any.
    pub oid_extra: Option<Oid>,
    /// Tag selecting post-aggregation scaling.
    pub identifier: Option<String>,
}

impl PreparedParam {
    /// A prepared parameter for `metric_oid` alone.
    pub fn new(metric_oid: Oid) -> PreparedParam {
        PreparedParam {
            metric_oid: metric_oid,
            metadata: HashMap::new(),
            oid_extra: None,
            identifier: None,
        }
    }
}

/// Results an inspector may keep between calls within one polling cycle.
#[derive(Debug, Default)]
pub struct Cache {
    entries: HashMap<String, Vec<RawReading>>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Cache {
        Cache::default()
    }

    /// Readings previously stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Vec<RawReading>> {
        self.entries.get(key)
    }

    /// Store `readings` under `key`.
    pub fn insert<S: Into<String>>(&mut self, key: S, readings: Vec<RawReading>) {
        self.entries.insert(key.into(), readings);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Inspection failures.
#[derive(Debug)]
pub enum InspectorError {
    /// A meter's `type` names no known conversion.
    UnsupportedType(String),
    /// The host could not be queried.
    Query(String),
}

impl fmt::Display for InspectorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InspectorError::UnsupportedType(ref t) => write!(f, "unsupported value type {:?}", t),
            InspectorError::Query(ref e) => write!(f, "inspection failed: {}", e),
        }
    }
}

impl error::Error for InspectorError {}

/// Reads hardware counters from a host.
pub trait Inspector {
    /// Turn operator parameters into query-ready ones.
    fn prepare_params(&self, param: &MeterParam) -> Result<PreparedParam, InspectorError>;

    /// Read `param.metric_oid` from `host`.
    fn inspect_generic(
        &self,
        host: &Url,
        cache: &mut Cache,
        extra_metadata: &Metadata,
        param: &PreparedParam,
    ) -> Result<Vec<RawReading>, InspectorError>;
}

#[cfg(test)]
mod test {
    use super::*;
    use toml;

    #[test]
    fn test_coercion_lookup() {
        assert_eq!(Coercion::Int, "int".parse().unwrap());
        assert_eq!(Coercion::Float, "float".parse().unwrap());
        match "__import__('os')".parse::<Coercion>() {
            Err(InspectorError::UnsupportedType(t)) => assert_eq!("__import__('os')", t),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_coercion_apply() {
        assert_eq!(3.0, Coercion::Int.apply(3.9));
        assert_eq!(-3.0, Coercion::Int.apply(-3.9));
        assert_eq!(3.9, Coercion::Float.apply(3.9));
    }

    #[test]
    fn test_meter_param_from_toml() {
        let param: MeterParam = toml::from_str(
            r#"
oid = "1.3.6.1.2.1.2.2.1.10"
type = "int"
oid_extra = "1.3.6.1.2.1.2.2.1.16"
identifier = "network"
[metadata]
name = "1.3.6.1.2.1.2.2.1.2"
"#,
        ).unwrap();
        assert_eq!(Some(&"1.3.6.1.2.1.2.2.1.2".to_string()), param.metadata.get("name"));

        let mut bare = param.clone();
        bare.metadata.clear();
        assert_eq!(
            MeterParam::new("1.3.6.1.2.1.2.2.1.10", "int")
                .oid_extra("1.3.6.1.2.1.2.2.1.16")
                .identifier("network"),
            bare
        );
    }

    #[test]
    fn test_reading_name() {
        let mut md = Metadata::new();
        md.insert("name".into(), Value::String("eth0".into()));
        assert_eq!(Some("eth0"), RawReading::new(1.0, md, Metadata::new()).name());
        assert_eq!(None, RawReading::new(1.0, Metadata::new(), Metadata::new()).name());
    }

    #[test]
    fn test_cache() {
        let mut cache = Cache::new();
        assert!(cache.get("1.3.6").is_none());
        cache.insert("1.3.6", vec![RawReading::new(1.0, Metadata::new(), Metadata::new())]);
        assert_eq!(1, cache.get("1.3.6").unwrap().len());
        cache.clear();
        assert!(cache.get("1.3.6").is_none());
    }
}
