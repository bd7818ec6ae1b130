//! Cluster-wide aggregation over a per-device inspector.

use inspector::{Cache, Coercion, Inspector, InspectorError, MeterParam, Metadata, Oid,
                PreparedParam, RawReading};
use serde_json::Value;
use url::Url;

/// Substrings of a reading's `name` that mark it as part of the aggregate.
const DEVICE_PATTERNS: [&str; 2] = ["eth", "sd"];

/// Bits per byte, applied to `network` aggregates.
const NETWORK_SCALE: f64 = 8.0;

/// Resource id stamped onto every aggregate reading.
const AGGREGATE_RESOURCE_ID: &str = "cluster";

/// Collapses per-interface and per-device readings into one figure.
///
/// `Aggregate` wraps another inspector and queries it up to twice per call:
/// once for the meter's OID and, when configured, once for its `oid_extra`.
/// Readings whose name contains `eth` or `sd` are summed across both
/// queries. Meters tagged `network` are converted from bytes to bits at the
/// end. Exactly one reading comes back, attributed to resource `cluster`.
pub struct Aggregate<I> {
    inner: I,
}

impl<I: Inspector> Aggregate<I> {
    /// Wrap `inner`.
    pub fn new(inner: I) -> Aggregate<I> {
        Aggregate { inner: inner }
    }

    /// The wrapped inspector.
    pub fn inner(&self) -> &I {
        &self.inner
    }
}

fn matches(reading: &RawReading) -> bool {
    match reading.name() {
        Some(name) => DEVICE_PATTERNS.iter().any(|p| name.contains(p)),
        None => false,
    }
}

fn filtered_sum(readings: &[RawReading]) -> f64 {
    readings
        .iter()
        .filter(|r| {
            let keep = matches(r);
            if !keep {
                trace!("aggregate skipping reading {:?}", r.name());
            }
            keep
        })
        .map(|r| r.value)
        .sum()
}

impl<I: Inspector> Inspector for Aggregate<I> {
    fn prepare_params(&self, param: &MeterParam) -> Result<PreparedParam, InspectorError> {
        let mut prepared = self.inner.prepare_params(param)?;
        let coercion: Coercion = param.type_name.parse()?;
        prepared.oid_extra = param
            .oid_extra
            .as_ref()
            .map(|oid| Oid::new(oid.as_str(), coercion));
        prepared.identifier = param.identifier.clone();
        Ok(prepared)
    }

    fn inspect_generic(
        &self,
        host: &Url,
        cache: &mut Cache,
        extra_metadata: &Metadata,
        param: &PreparedParam,
    ) -> Result<Vec<RawReading>, InspectorError> {
        let readings = self.inner
            .inspect_generic(host, cache, extra_metadata, param)?;
        let mut total = filtered_sum(&readings);

        if let Some(ref extra) = param.oid_extra {
            if !extra.oid.is_empty() {
                let mut extra_param = param.clone();
                extra_param.metric_oid = extra.clone();
                let readings = self.inner
                    .inspect_generic(host, cache, extra_metadata, &extra_param)?;
                total += filtered_sum(&readings);
            }
        }

        if param.identifier.as_ref().map(String::as_str) == Some("network") {
            total *= NETWORK_SCALE;
        }
        debug!(
            "aggregate {} for {}: {}",
            param.metric_oid.oid, host, total
        );

        let mut extra = Metadata::new();
        extra.insert(
            "resource_id".to_string(),
            Value::String(AGGREGATE_RESOURCE_ID.to_string()),
        );
        Ok(vec![RawReading::new(total, Metadata::new(), extra)])
    }
}
