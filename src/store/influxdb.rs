//! InfluxDB 1.x over its HTTP API.
//!
//! Measurements are rendered into line protocol and POSTed to `/write`. A
//! connection is considered established once `/ping` answers.

use serde_json::Number;
use std::time::Duration;
use store::{Connector, Measurement, Store, StoreError};
use time;
use ureq;
use url::Url;

/// Configuration for the InfluxDB store.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxDBConfig {
    /// The InfluxDB host. May be an IP address or DNS hostname.
    pub host: String,
    /// The InfluxDB HTTP port.
    pub port: u16,
    /// Username sent with every request.
    pub username: String,
    /// Password sent with every request.
    pub password: String,
    /// The database measurements are written into.
    pub database: String,
    /// Per-request timeout, in seconds.
    pub timeout: u64,
}

impl Default for InfluxDBConfig {
    fn default() -> Self {
        InfluxDBConfig {
            host: "localhost".to_string(),
            port: 8086,
            username: "root".to_string(),
            password: "password".to_string(),
            database: "ceilometer".to_string(),
            timeout: 5,
        }
    }
}

/// Opens `InfluxDB` handles from an `InfluxDBConfig`.
#[derive(Debug, Clone)]
pub struct InfluxDBConnector {
    config: InfluxDBConfig,
}

impl InfluxDBConnector {
    /// Create a connector. No network traffic happens until `connect`.
    pub fn new(config: InfluxDBConfig) -> InfluxDBConnector {
        InfluxDBConnector { config: config }
    }

    /// The configuration this connector was built with.
    pub fn config(&self) -> &InfluxDBConfig {
        &self.config
    }
}

/// A live InfluxDB handle.
pub struct InfluxDB {
    agent: ureq::Agent,
    base: Url,
    database: String,
    username: String,
    password: String,
    body: String,
}

impl Connector for InfluxDBConnector {
    type Store = InfluxDB;

    fn connect(&self) -> Result<InfluxDB, StoreError> {
        let base = Url::parse(&format!("http://{}:{}/", self.config.host, self.config.port))
            .map_err(|e| StoreError::Address(e.to_string()))?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout))
            .build();

        let ping = endpoint(&base, "ping")?;
        trace!("pinging influxdb at {}", ping);
        agent
            .get(ping.as_str())
            .call()
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        info!(
            "connected to influxdb at {} database {}",
            base, self.config.database
        );
        Ok(InfluxDB {
            agent: agent,
            base: base,
            database: self.config.database.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
            body: String::with_capacity(1_024),
        })
    }
}

impl Store for InfluxDB {
    fn write_points(&mut self, points: &[Measurement]) -> Result<(), StoreError> {
        self.body.clear();
        for point in points {
            format_line(point, &mut self.body)?;
        }
        let write = endpoint(&self.base, "write")?;
        debug!("BODY: {:?}", self.body);
        let res = self.agent
            .post(write.as_str())
            .query("db", &self.database)
            .query("u", &self.username)
            .query("p", &self.password)
            .query("precision", "n")
            .send_string(&self.body);
        match res {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => {
                let reason = resp.into_string().unwrap_or_default();
                Err(StoreError::Write(format!("status {}: {}", code, reason.trim())))
            }
            Err(e) => Err(StoreError::Write(e.to_string())),
        }
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, StoreError> {
    base.join(path).map_err(|e| StoreError::Address(e.to_string()))
}

#[inline]
fn escape_measurement(name: &str, s: &mut String) {
    for c in name.chars() {
        match c {
            ',' | ' ' => {
                s.push('\\');
                s.push(c);
            }
            '\n' => s.push_str("\\n"),
            _ => s.push(c),
        }
    }
}

#[inline]
fn fmt_value(value: &Number, s: &mut String) {
    s.push_str(&value.to_string());
    if !value.is_f64() {
        s.push('i');
    }
}

/// Render one measurement as a line-protocol line, newline terminated.
fn format_line(point: &Measurement, s: &mut String) -> Result<(), StoreError> {
    let ns = time::parse_ns(&point.time)?;
    escape_measurement(&point.measurement, s);
    s.push_str(" value=");
    fmt_value(&point.fields.value, s);
    s.push(' ');
    s.push_str(&ns.to_string());
    s.push('\n');
    Ok(())
}
