#![allow(unknown_lints)]

extern crate chrono;
extern crate fern;
extern crate meterd;
extern crate serde_json;

#[macro_use]
extern crate log;

use chrono::Utc;
use meterd::dispatcher::{Dispatcher, MeteringDispatcher, METERING_RECORDED,
                         METERING_SIGNATURE_INVALID};
use meterd::inspector::Coercion;
use meterd::sample::Payload;
use meterd::store::InfluxDBConnector;
use std::io;
use std::io::BufRead;
use std::process;
use std::sync::atomic::Ordering;

fn main() {
    let args = meterd::config::parse_args();

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let logging = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("meterd"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply();
    if let Err(e) = logging {
        eprintln!("could not set up logging: {}", e);
        process::exit(1);
    }

    info!("meterd - {}", args.version);

    // meters are consumed by an embedding host, but a typo should still
    // stop startup here rather than at first poll
    for (name, meter) in &args.meters {
        if let Err(e) = meter.type_name.parse::<Coercion>() {
            error!("{}: {}", name, e);
            process::exit(1);
        }
        debug!("aggregate meter {} reads {}", name, meter.oid);
    }

    let connector = InfluxDBConnector::new(args.store.clone());
    let mut dispatcher = MeteringDispatcher::new(connector, args.telemetry_secret.clone());

    let stdin = io::stdin();
    for (idx, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read metering data from stdin: {}", e);
                process::exit(1);
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let payload: Payload = match serde_json::from_str(&line) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("skipping unparseable line {}: {}", idx + 1, e);
                continue;
            }
        };
        if let Err(e) = dispatcher.record_metering_data(payload) {
            error!("metering dispatch failed at line {}: {}", idx + 1, e);
            process::exit(1);
        }
    }

    info!(
        "recorded {} samples, discarded {} with invalid signatures",
        METERING_RECORDED.load(Ordering::Relaxed),
        METERING_SIGNATURE_INVALID.load(Ordering::Relaxed)
    );
}
