//! The time-series store a dispatcher writes into.
//!
//! A `Connector` knows how to reach a store and produces a `Store` handle.
//! `Connection` tracks whether such a handle currently exists, creating one
//! on demand.

use serde_json::Number;
use std::error;
use std::fmt;
use time;

mod influxdb;

pub use self::influxdb::{InfluxDB, InfluxDBConfig, InfluxDBConnector};

/// The single field carried by a measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fields {
    /// The sample's volume.
    pub value: Number,
}

/// A store-specific write record derived from one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// `<resource_id>.<counter_name>`
    pub measurement: String,
    /// The sample timestamp, passed through verbatim.
    pub time: String,
    /// The recorded values.
    pub fields: Fields,
}

impl Measurement {
    /// Build a measurement named `name` at `time` carrying `value`.
    pub fn new<S, T>(name: S, time: T, value: Number) -> Measurement
    where
        S: Into<String>,
        T: Into<String>,
    {
        Measurement {
            measurement: name.into(),
            time: time.into(),
            fields: Fields { value: value },
        }
    }
}

/// Failures talking to a store.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached or refused the connection.
    Connect(String),
    /// The store rejected or never received a write.
    Write(String),
    /// A measurement's time could not be converted for the store.
    Timestamp(time::ParseError),
    /// The configured address is not a usable URL.
    Address(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StoreError::Connect(ref e) => write!(f, "unable to connect to store: {}", e),
            StoreError::Write(ref e) => write!(f, "unable to write to store: {}", e),
            StoreError::Timestamp(ref e) => write!(f, "bad measurement time: {}", e),
            StoreError::Address(ref e) => write!(f, "bad store address: {}", e),
        }
    }
}

impl error::Error for StoreError {}

impl From<time::ParseError> for StoreError {
    fn from(e: time::ParseError) -> StoreError {
        StoreError::Timestamp(e)
    }
}

/// An open handle to a store.
pub trait Store {
    /// Write `points` in one request.
    fn write_points(&mut self, points: &[Measurement]) -> Result<(), StoreError>;
}

/// Something that can open a `Store`.
pub trait Connector {
    /// The handle produced on success.
    type Store: Store;

    /// Open a new handle. May be called any number of times.
    fn connect(&self) -> Result<Self::Store, StoreError>;
}

/// Whether a store handle currently exists.
#[derive(Debug)]
pub enum Connection<S> {
    /// No handle, either never established or cleared.
    Disconnected,
    /// A live handle.
    Connected(S),
}

impl<S> Default for Connection<S> {
    fn default() -> Connection<S> {
        Connection::Disconnected
    }
}

impl<S: Store> Connection<S> {
    /// Return the handle, asking `connector` for one if there is none.
    ///
    /// A failed attempt leaves the state `Disconnected`.
    pub fn get_or_connect<C>(&mut self, connector: &C) -> Result<&mut S, StoreError>
    where
        C: Connector<Store = S>,
    {
        if let Connection::Disconnected = *self {
            *self = Connection::Connected(connector.connect()?);
        }
        match *self {
            Connection::Connected(ref mut store) => Ok(store),
            Connection::Disconnected => Err(StoreError::Connect("no handle".into())),
        }
    }

    /// True when a handle is held.
    pub fn is_connected(&self) -> bool {
        match *self {
            Connection::Connected(_) => true,
            Connection::Disconnected => false,
        }
    }

    /// Drop any held handle.
    pub fn clear(&mut self) {
        *self = Connection::Disconnected;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json;
    use std::cell::Cell;

    struct Nop;

    impl Store for Nop {
        fn write_points(&mut self, _: &[Measurement]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Flaky {
        up: Cell<bool>,
        attempts: Cell<usize>,
    }

    impl Connector for Flaky {
        type Store = Nop;

        fn connect(&self) -> Result<Nop, StoreError> {
            self.attempts.set(self.attempts.get() + 1);
            if self.up.get() {
                Ok(Nop)
            } else {
                Err(StoreError::Connect("down".into()))
            }
        }
    }

    #[test]
    fn test_measurement_wire_shape() {
        let m = Measurement::new("r1.cpu", "2024-01-01T00:00:00Z", Number::from(7));
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(
            json!({"measurement": "r1.cpu", "time": "2024-01-01T00:00:00Z", "fields": {"value": 7}}),
            v
        );
    }

    #[test]
    fn test_failed_connect_keeps_handle_absent() {
        let connector = Flaky {
            up: Cell::new(false),
            attempts: Cell::new(0),
        };
        let mut conn: Connection<Nop> = Connection::default();
        for _ in 0..3 {
            match conn.get_or_connect(&connector) {
                Err(StoreError::Connect(ref e)) => assert_eq!("down", e),
                other => panic!("unexpected {:?}", other.map(|_| ())),
            }
            assert!(!conn.is_connected());
        }
        assert_eq!(3, connector.attempts.get());
    }

    #[test]
    fn test_connect_on_demand() {
        let connector = Flaky {
            up: Cell::new(false),
            attempts: Cell::new(0),
        };
        let mut conn: Connection<Nop> = Connection::default();

        assert!(conn.get_or_connect(&connector).is_err());
        assert!(!conn.is_connected());

        connector.up.set(true);
        assert!(conn.get_or_connect(&connector).is_ok());
        assert!(conn.is_connected());
        assert!(conn.get_or_connect(&connector).is_ok());
        assert_eq!(2, connector.attempts.get());

        conn.clear();
        assert!(!conn.is_connected());
        assert!(conn.get_or_connect(&connector).is_ok());
        assert_eq!(3, connector.attempts.get());
    }
}
