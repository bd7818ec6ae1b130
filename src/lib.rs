//! meterd is a metering-data dispatcher. It accepts signed metering samples
//! from a telemetry pipeline, checks their integrity and writes each one into
//! InfluxDB as a single measurement.
//!
//! Alongside the dispatcher sits an aggregating sampler which wraps a
//! hardware inspector, folds per-interface and per-device counters into one
//! cluster-wide reading and converts units on the way out.
//!
//! Both pieces are synchronous and are driven by an outside scheduler. See
//! `dispatcher::MeteringDispatcher` and `inspector::Aggregate` to get
//! started.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate hex;
extern crate hmac;
extern crate serde;
extern crate sha2;
extern crate toml;
extern crate ureq;
extern crate url;
#[cfg_attr(test, macro_use)]
extern crate serde_json;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;

pub mod config;
pub mod dispatcher;
pub mod inspector;
pub mod sample;
pub mod signature;
pub mod store;
pub mod time;
