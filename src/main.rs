use std::env;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use flight_log::plane::{
    plane_catalogue, ArmDisarm, ControlTuning, NavTuning, Performance, PlaneMessage, Sonar,
    Startup, Status,
};
use flight_log::{
    replay_into, Catalogue, CategoryMask, LogConfig, Logger, MonotonicClock, Record, RecordSink,
    StreamWriter, Termination, TimeSource,
};

const USAGE: &str = "\
usage: flight-log <command>

commands:
  formats               list the built-in message formats
  categories            show every log category and whether it is enabled
  enable <name|all>     enable a category, print the new mask
  disable <name|all>    disable a category, print the new mask
  record [path] [n]     write a sample log of n loop iterations
  dump [path]           decode a log and print every record

The mask is read from FLIGHT_LOG_BITMASK and the default path from
FLIGHT_LOG_PATH. Set RUST_LOG to control diagnostics.";

fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(writer)
        .init();

    let config = LogConfig::from_env().context("reading configuration")?;
    let args: Vec<String> = env::args().skip(1).collect();
    let path = |i: usize| {
        args.get(i)
            .map(PathBuf::from)
            .unwrap_or_else(|| config.log_path.clone())
    };

    match args.first().map(String::as_str) {
        Some("formats") => formats(),
        Some("categories") => {
            categories(&CategoryMask::plane(config.bitmask));
            Ok(())
        }
        Some(cmd @ ("enable" | "disable")) => {
            let Some(name) = args.get(1) else {
                bail!("{cmd} needs a category name\n\n{USAGE}");
            };
            toggle(config.bitmask, cmd == "enable", name)
        }
        Some("record") => {
            let iterations = match args.get(2) {
                Some(n) => n.parse().with_context(|| format!("bad iteration count {n:?}"))?,
                None => 50,
            };
            record(&path(1), config.bitmask, iterations)
        }
        Some("dump") => dump(&path(1)),
        _ => {
            println!("{USAGE}");
            Ok(())
        }
    }
}

fn formats() -> Result<()> {
    let catalogue = plane_catalogue()?;
    println!("{:<5} {:>4} {:>4}  {:<16} {}", "NAME", "ID", "LEN", "FORMAT", "COLUMNS");
    for (entry, row) in catalogue.list().zip(catalogue.listing()) {
        println!(
            "{:<5} {:>4} {:>4}  {:<16} {}",
            row.name,
            entry.message_id(),
            entry.byte_length(),
            row.codes,
            row.labels
        );
    }
    Ok(())
}

fn categories(mask: &CategoryMask) {
    for category in mask.table().iter() {
        let state = if mask.is_enabled(category) { "on" } else { "off" };
        println!("{:<14} {:<4} {}", category.name, state, category.description);
    }
    println!("enabled: {mask}");
}

fn toggle(bits: u32, enable: bool, name: &str) -> Result<()> {
    let mask = CategoryMask::plane(bits);
    let new = if enable {
        mask.enable(name)?
    } else {
        mask.disable(name)?
    };
    println!("{}=0x{new:08x}", flight_log::config::BITMASK_ENV);
    println!("enabled: {mask}");
    Ok(())
}

/// Writes a short synthetic flight: boot, arm, then `iterations` passes of
/// the main loop logging whatever the mask allows.
fn record(path: &Path, bits: u32, iterations: u32) -> Result<()> {
    let catalogue = plane_catalogue()?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mask = Arc::new(CategoryMask::plane(bits));
    let clock = MonotonicClock::new();
    let mut logger = Logger::new(catalogue, mask.clone(), StreamWriter::new(BufWriter::new(file)));

    if !logger.start_new_log()? {
        bail!("no storage for {}", path.display());
    }
    logger.write_message(&Startup {
        time_us: clock.micros64(),
        startup_type: 0,
        command_total: 0,
    })?;
    logger.write_message(&ArmDisarm {
        time_us: clock.micros64(),
        arm_state: 1,
        arm_checks: 0xFFFF,
    })?;

    for i in 0..iterations {
        let t = clock.micros64();
        let phase = i as f32 * 0.1;
        logger.write_message(&ControlTuning {
            time_us: t,
            nav_roll_cd: (phase.sin() * 3000.0) as i16,
            roll_cd: (phase.sin() * 2900.0) as i16,
            nav_pitch_cd: 500,
            pitch_cd: 480,
            throttle_out: 60,
            rudder_out: 0,
            throttle_dem: 62,
        })?;
        logger.write_message(&NavTuning {
            time_us: t,
            yaw_cd: sample_heading_cd(i),
            wp_distance: 500.0 - i as f32,
            target_bearing_cd: 9000,
            nav_bearing_cd: 8950,
            altitude_error_cm: -25,
            airspeed_cm: 1800,
            altitude: 120.0 + phase.cos(),
            groundspeed_cm: 1750,
            xtrack_error: phase.sin() * 2.0,
        })?;
        logger.write_message(&Status {
            time_us: t,
            is_flying: 1,
            is_flying_probability: 1.0,
            armed: 1,
            safety: 0,
            is_crashed: 0,
            is_still: 0,
            stage: 3,
            impact: 0,
        })?;
        logger.write_message(&Sonar {
            time_us: t,
            distance_cm: 700,
            voltage: 2.1,
            baro_alt: 120.0,
            groundspeed: 17.5,
            throttle: 60,
            count: 1,
            correction: 0.0,
        })?;
        if i % 10 == 9 {
            logger.write_message(&Performance {
                time_us: t,
                loop_time: 20_000,
                main_loop_count: 10,
                g_dt_max: 21_000,
                gyro_drift_x: 0,
                gyro_drift_y: 0,
                gyro_drift_z: 0,
                i2c_lockup_count: 0,
                ins_error_count: 0,
            })?;
        }
    }

    logger.flush()?;
    let stats = logger.stats();
    info!(
        path = %path.display(),
        written = stats.written,
        suppressed = stats.suppressed,
        bytes = stats.bytes,
        "log written"
    );
    println!(
        "{}: {} records, {} bytes, {} suppressed (categories: {mask})",
        path.display(),
        stats.written,
        stats.bytes,
        stats.suppressed
    );
    Ok(())
}

/// Heading for loop pass `i`: one degree per pass, wrapping at 360.
fn sample_heading_cd(i: u32) -> u32 {
    (i % 360) * 100
}

fn dump(path: &Path) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let recovered;
    let catalogue: &Catalogue = match Catalogue::from_log(&data) {
        Ok(cat) if cat.len() > 1 => {
            recovered = cat;
            &recovered
        }
        Ok(_) => plane_catalogue()?,
        Err(err) => {
            warn!(%err, "format records unusable, using built-in formats");
            plane_catalogue()?
        }
    };

    let summary = replay_into(catalogue, &data, &mut Printer);
    match summary.termination {
        Termination::EndOfStream => {}
        Termination::Truncated {
            offset,
            needed,
            available,
        } => println!("{offset:>8}  <truncated: {available} of {needed} bytes>"),
    }
    println!(
        "{} records, {} unknown headers, {} of {} bytes consumed",
        summary.records,
        summary.unknown,
        summary.consumed,
        data.len()
    );
    Ok(())
}

struct Printer;

impl RecordSink for Printer {
    fn record(&mut self, record: &Record<'_>) {
        println!("{:>8}  {record}", record.offset());
        if let PlaneMessage::ArmDisarm(arm) = PlaneMessage::from_record(record) {
            info!(time_us = arm.time_us, state = arm.arm_state, "arming event");
        }
    }

    fn unknown(&mut self, id: u8, offset: usize, raw: &[u8]) {
        println!("{offset:>8}  <unknown id {id}, {} bytes>", raw.len());
    }
}
