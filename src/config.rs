//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the server can consume and use as configuration data.

use clap::{App, Arg};
use inspector::MeterParam;
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use store::InfluxDBConfig;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Shared secret used when none is configured. Operators are expected to
/// override it.
pub const DEFAULT_TELEMETRY_SECRET: &str = "change this for valid signing";

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// Configuration for the meterd executable
///
/// Built once at startup from the config file and handed to each component's
/// constructor. Please see documentation on `parse_args` in this module for
/// more details.
#[derive(Debug)]
pub struct Args {
    /// The verbosity setting of meterd. The higher the value the more chatty
    /// meterd gets.
    pub verbose: u64,
    /// meterd version string. This is set automatically.
    pub version: String,
    /// Where and how to reach the store. See `store::InfluxDB`.
    pub store: InfluxDBConfig,
    /// Shared secret samples are signed with. Empty disables verification.
    pub telemetry_secret: String,
    /// Aggregated meters, keyed by `meters.<name>`.
    pub meters: HashMap<String, MeterParam>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            verbose: 0,
            version: default_version(),
            store: InfluxDBConfig::default(),
            telemetry_secret: DEFAULT_TELEMETRY_SECRET.to_string(),
            meters: HashMap::new(),
        }
    }
}

/// Reasons a configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(PathBuf, io::Error),
    /// The config file is not valid TOML.
    Parse(toml::de::Error),
    /// A key holds a value of the wrong type or range.
    Invalid(String, &'static str),
    /// A meter table could not be understood.
    Meter(String, toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref path, ref e) => {
                write!(f, "could not read {}: {}", path.display(), e)
            }
            ConfigError::Parse(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::Invalid(ref key, expected) => {
                write!(f, "could not parse {}, expected {}", key, expected)
            }
            ConfigError::Meter(ref name, ref e) => {
                write!(f, "could not parse {}: {}", name, e)
            }
        }
    }
}

impl error::Error for ConfigError {}

/// Parse the meterd configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. Most configuration is stored in an on-disk file. See
/// `meterd --help` for more information. Exits the process if the
/// configuration cannot be loaded.
pub fn parse_args() -> Args {
    let args = App::new("meterd")
        .version(VERSION.unwrap_or("unknown"))
        .about("verify signed metering samples and record them in InfluxDB")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");

    let filename = match args.value_of("config-file") {
        Some(filename) => filename,
        None => unreachable!(),
    };
    match parse_config_path(Path::new(filename), verb) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Read and parse the config file at `path`.
pub fn parse_config_path(path: &Path, verbosity: u64) -> Result<Args, ConfigError> {
    let mut buffer = String::new();
    File::open(path)
        .and_then(|mut fp| fp.read_to_string(&mut buffer))
        .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    parse_config_file(&buffer, verbosity)
}

fn get_str(tbl: &toml::Value, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
    match tbl.get(key) {
        None => Ok(None),
        Some(v) => v.as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ConfigError::Invalid(format!("{}.{}", section, key), "a string")),
    }
}

fn get_int(tbl: &toml::Value, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
    match tbl.get(key) {
        None => Ok(None),
        Some(v) => v.as_integer()
            .map(Some)
            .ok_or_else(|| ConfigError::Invalid(format!("{}.{}", section, key), "an integer")),
    }
}

/// Parse the meterd configuration file.
///
/// Every key is optional. Anything missing keeps its default:
///
/// ```toml
/// [store]
/// host = "localhost"
/// port = 8086
/// username = "root"
/// password = "password"
/// database = "ceilometer"
/// timeout = 5
///
/// [publisher]
/// telemetry_secret = "change this for valid signing"
///
/// [meters.network_incoming]
/// oid = "1.3.6.1.2.1.2.2.1.10"
/// type = "int"
/// oid_extra = "1.3.6.1.2.1.31.1.1.1.6"
/// identifier = "network"
/// ```
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, ConfigError> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer).map_err(ConfigError::Parse)?;

    args.verbose = verbosity;

    if let Some(store) = value.get("store") {
        if let Some(host) = get_str(store, "store", "host")? {
            args.store.host = host;
        }
        if let Some(port) = get_int(store, "store", "port")? {
            if port < 1 || port > i64::from(u16::max_value()) {
                return Err(ConfigError::Invalid("store.port".to_string(), "a port number"));
            }
            args.store.port = port as u16;
        }
        if let Some(username) = get_str(store, "store", "username")? {
            args.store.username = username;
        }
        if let Some(password) = get_str(store, "store", "password")? {
            args.store.password = password;
        }
        if let Some(database) = get_str(store, "store", "database")? {
            args.store.database = database;
        }
        if let Some(timeout) = get_int(store, "store", "timeout")? {
            if timeout < 1 {
                return Err(ConfigError::Invalid(
                    "store.timeout".to_string(),
                    "a positive number of seconds",
                ));
            }
            args.store.timeout = timeout as u64;
        }
    }

    if let Some(publisher) = value.get("publisher") {
        if let Some(secret) = get_str(publisher, "publisher", "telemetry_secret")? {
            args.telemetry_secret = secret;
        }
    }

    if let Some(meters) = value.get("meters") {
        let meters = meters
            .as_table()
            .ok_or_else(|| ConfigError::Invalid("meters".to_string(), "a table"))?;
        for (name, tbl) in meters.iter() {
            let config_path = format!("meters.{}", name);
            let param: MeterParam = tbl.clone()
                .try_into()
                .map_err(|e| ConfigError::Meter(config_path.clone(), e))?;
            args.meters.insert(config_path, param);
        }
    }

    Ok(args)
}
