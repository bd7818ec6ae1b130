//! Dispatchers move metering data out of the pipeline and into storage.

use sample::Payload;
use serde_json::Value;
use std::error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use store::StoreError;

mod metering;

pub use self::metering::MeteringDispatcher;

lazy_static! {
    /// Total samples written to the store.
    pub static ref METERING_RECORDED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total samples discarded for a bad signature.
    pub static ref METERING_SIGNATURE_INVALID: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total samples whose write failed.
    pub static ref METERING_WRITE_FAILED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total failed attempts to open a store connection.
    pub static ref STORE_CONNECT_FAILED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Why a dispatch call stopped early.
#[derive(Debug)]
pub enum DispatchError {
    /// The store was unreachable or rejected a write.
    Store(StoreError),
    /// A sample lacked a field every sample must carry.
    MissingField(&'static str),
    /// A sample field was present but of the wrong shape.
    InvalidField(&'static str),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DispatchError::Store(ref e) => write!(f, "{}", e),
            DispatchError::MissingField(name) => write!(f, "sample has no {}", name),
            DispatchError::InvalidField(name) => write!(f, "sample has an invalid {}", name),
        }
    }
}

impl error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            DispatchError::Store(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(e: StoreError) -> DispatchError {
        DispatchError::Store(e)
    }
}

/// A destination for metering samples and events.
pub trait Dispatcher {
    /// Record one sample or a batch of them.
    fn record_metering_data(&mut self, data: Payload) -> Result<(), DispatchError>;
    /// Record events.
    fn record_events(&mut self, events: Vec<Value>) -> Result<(), DispatchError>;
}
