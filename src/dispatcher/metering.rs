//! Signature-verifying dispatch of metering samples into a store.

use dispatcher::{DispatchError, Dispatcher, METERING_RECORDED, METERING_SIGNATURE_INVALID,
                 METERING_WRITE_FAILED, STORE_CONNECT_FAILED};
use sample::{Payload, Sample};
use serde_json::Value;
use signature;
use std::sync::atomic::Ordering;
use store::{Connection, Connector, Measurement, Store};
use time;

/// Writes verified metering samples into a store, one write per sample.
///
/// Each sample's signature is checked against the shared telemetry secret.
/// Samples that fail are logged and dropped, and the rest of the batch goes
/// on. A failed write ends the batch and is handed back to the caller.
///
/// The store connection is opened at construction if possible and otherwise
/// on first use.
pub struct MeteringDispatcher<C: Connector> {
    connector: C,
    conn: Connection<C::Store>,
    secret: String,
}

impl<C: Connector> MeteringDispatcher<C> {
    /// Create a new dispatcher.
    ///
    /// A store that cannot be reached yet is not an error here. The failure
    /// is logged and the connection is retried on first use.
    pub fn new<S>(connector: C, secret: S) -> MeteringDispatcher<C>
    where
        S: Into<String>,
    {
        let mut dispatcher = MeteringDispatcher {
            connector: connector,
            conn: Connection::Disconnected,
            secret: secret.into(),
        };
        if let Err(e) = dispatcher.conn() {
            error!("Failed to connect to store for metering, retry later: {}", e);
        }
        dispatcher
    }

    /// The store handle, connecting first if there is none.
    pub fn conn(&mut self) -> Result<&mut C::Store, DispatchError> {
        match self.conn.get_or_connect(&self.connector) {
            Ok(store) => Ok(store),
            Err(e) => {
                STORE_CONNECT_FAILED.fetch_add(1, Ordering::Relaxed);
                Err(DispatchError::Store(e))
            }
        }
    }

    /// True when a store handle is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Drop the store handle. The next write reconnects.
    pub fn disconnect(&mut self) {
        self.conn.clear();
    }

    fn record(&mut self, sample: &Sample) -> Result<(), DispatchError> {
        let counter_name = sample
            .counter_name()
            .ok_or(DispatchError::MissingField("counter_name"))?;
        let resource_id = sample
            .resource_id()
            .ok_or(DispatchError::MissingField("resource_id"))?;
        let volume = sample
            .counter_volume()
            .ok_or(DispatchError::MissingField("counter_volume"))?;
        debug!(
            "metering data {} for {} @ {}: {}",
            counter_name,
            resource_id,
            match sample.timestamp() {
                Some(&Value::String(ref t)) => t.clone(),
                Some(t) => t.to_string(),
                None => "NO TIMESTAMP".to_string(),
            },
            volume
        );

        if !signature::verify_signature(sample, &self.secret) {
            METERING_SIGNATURE_INVALID.fetch_add(1, Ordering::Relaxed);
            warn!("message signature invalid, discarding message: {}", sample);
            return Ok(());
        }

        let written = measurement(sample, resource_id, counter_name).and_then(|measure| {
            self.conn()
                .and_then(|store| store.write_points(&[measure]).map_err(DispatchError::from))
        });
        match written {
            Ok(()) => {
                METERING_RECORDED.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                METERING_WRITE_FAILED.fetch_add(1, Ordering::Relaxed);
                error!("Failed to record metering data: {:?}", e);
                Err(e)
            }
        }
    }
}

/// Build the measurement for a verified sample.
fn measurement(
    sample: &Sample,
    resource_id: &str,
    counter_name: &str,
) -> Result<Measurement, DispatchError> {
    let timestamp = match sample.timestamp() {
        None | Some(&Value::Null) => time::now(),
        Some(&Value::String(ref t)) if t.is_empty() => time::now(),
        Some(&Value::String(ref t)) => t.clone(),
        Some(_) => return Err(DispatchError::InvalidField("timestamp")),
    };
    let value = sample
        .volume()
        .ok_or(DispatchError::InvalidField("counter_volume"))?
        .clone();
    let metric = format!("{}.{}", resource_id, counter_name);
    Ok(Measurement::new(metric, timestamp, value))
}

impl<C: Connector> Dispatcher for MeteringDispatcher<C> {
    fn record_metering_data(&mut self, data: Payload) -> Result<(), DispatchError> {
        for sample in data.into_samples() {
            self.record(&sample)?;
        }
        Ok(())
    }

    fn record_events(&mut self, _: Vec<Value>) -> Result<(), DispatchError> {
        // events are not stored by this dispatcher
        Ok(())
    }
}
