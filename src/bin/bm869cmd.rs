#![deny(clippy::unwrap_used)]

use bm869ctrl::device::Device;
use bm869ctrl::proto::{ProtoError, Result};
use bm869ctrl::reading::Reading;
use bm869ctrl::DEFAULT_DEVICE;
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Local};
use clap::{arg, command, value_parser};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::{Duration, Instant};

/// Seconds between two readings
const DEFAULT_INTERVAL: f64 = 1.0;

#[derive(Debug, Copy, Clone)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
            Self::Csv => f.write_str("csv"),
        }
    }
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Text, Self::Json, Self::Csv]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Text => clap::builder::PossibleValue::new("text"),
            Self::Json => clap::builder::PossibleValue::new("json"),
            Self::Csv => clap::builder::PossibleValue::new("csv"),
        })
    }
}

/// Reading with the local time it was taken
#[derive(Debug, Serialize)]
struct LiveReading<'a> {
    time: DateTime<Local>,
    #[serde(flatten)]
    reading: &'a Reading,
}

/// Seconds since logging started
#[derive(Debug, Clone, Copy)]
struct Elapsed(Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:5.1}", self.0.as_secs_f64()))
    }
}

/// One line of the CSV log
#[serde_with::serde_as]
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    #[serde(rename = "Time[S]")]
    #[serde_as(as = "serde_with::DisplayFromStr")]
    time: Elapsed,
    #[serde(rename = "Main")]
    main: &'a str,
    #[serde(rename = "Main unit")]
    main_unit: &'a str,
    #[serde(rename = "Secondary")]
    secondary: &'a str,
    #[serde(rename = "Secondary Unit")]
    secondary_unit: &'a str,
}

impl<'a> LogRecord<'a> {
    fn new(time: Duration, reading: &'a Reading) -> Self {
        Self {
            time: Elapsed(time),
            main: &reading.main_value,
            main_unit: &reading.main_unit,
            secondary: &reading.secondary_value,
            secondary_unit: &reading.secondary_unit,
        }
    }
}

impl fmt::Display for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{},{},{},{},{}",
            self.time, self.main, self.main_unit, self.secondary, self.secondary_unit
        ))
    }
}

#[tokio::main]
async fn main() {
    let matches =
        command!() // requires `cargo` feature
            .arg(
                arg!(
                    -p --device <PATH> "hidraw node of the USB interface cable"
                )
                .default_value(DEFAULT_DEVICE)
                .required(false)
                .value_parser(value_parser!(PathBuf)),
            )
            .arg(arg!(
                -d --debug ... "Turn debugging information on"
            ))
            .subcommand(
                clap::Command::new("mea")
                    .about("Get current reading")
                    .arg(arg!(
                        --"loop" "Poll current reading forever"
                    ))
                    .arg(
                        arg!(--"interval" <SECONDS> "Seconds between readings in loop mode")
                            .value_parser(value_parser!(f64)),
                    )
                    .arg(arg!(
                        --"fifo" <FIFO> "Write reading as f64 values (LE) to FIFO file, order is [MAIN][SEC] display"
                    ).value_parser(value_parser!(PathBuf)))
                    .arg(
                        arg!(--"format" <fmt> "Output format")
                            .value_parser(value_parser!(OutputFormat)),
                    ),
            )
            .subcommand(
                clap::Command::new("log")
                    .about("Log readings into a CSV file until interrupted")
                    .arg(
                        arg!(-o --out <PATH> "Output filename (default=BM869s_<timestamp>.csv)")
                            .value_parser(value_parser!(PathBuf)),
                    )
                    .arg(
                        arg!(-t --time <SECONDS> "Interval time in seconds between readings")
                            .value_parser(value_parser!(f64)),
                    ),
            )
            .subcommand_required(true)
            .get_matches();

    let level = match matches.get_count("debug") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = handle_args(&matches).await {
        let port = matches
            .get_one::<PathBuf>("device")
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match e {
            ProtoError::Io(err) => {
                if err.kind() == ErrorKind::NotFound {
                    eprintln!("{}: File not found", port);
                } else if err.kind() == ErrorKind::PermissionDenied {
                    eprintln!("{}: Permission denied", port);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", err, port);
                }
                exit(-1);
            }
            ProtoError::Timeout(timeout) => {
                eprintln!(
                    "No response within {:?}, is the meter switched on and in PC mode?",
                    timeout
                );
                exit(-1);
            }
            ProtoError::Frame(err) => {
                eprintln!("Received an invalid frame from device, aborting!: {}", err);
                exit(-1);
            }
            ProtoError::Abort => {
                eprintln!("Failed to communicate with device, aborting!");
                exit(-1);
            }
        }
    }
}

fn interval_arg(args: &clap::ArgMatches, id: &str) -> Result<Duration> {
    let seconds = args.get_one::<f64>(id).unwrap_or(&DEFAULT_INTERVAL);
    Duration::try_from_secs_f64(*seconds)
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e).into())
}

async fn handle_args(matches: &clap::ArgMatches) -> Result<()> {
    let port_path = matches
        .get_one::<PathBuf>("device")
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new(DEFAULT_DEVICE));

    let mut device = Device::new(port_path)?;
    log::info!("Connected to: {}", port_path.display());

    match matches.subcommand() {
        Some(("mea", args)) => {
            let endless_loop = args.get_one::<bool>("loop").unwrap_or(&false);
            let interval = interval_arg(args, "interval")?;

            let mut fifo = args
                .get_one::<PathBuf>("fifo")
                .map(|path| OpenOptions::new().append(true).create(true).open(path))
                .transpose()?;

            let format = args
                .get_one::<OutputFormat>("format")
                .unwrap_or(&OutputFormat::Text);

            let mut csv_output = None;
            let mut c = 1;
            loop {
                match device.reading().await {
                    Ok(reading) => {
                        match format {
                            OutputFormat::Text => {
                                println!("#{:0>4} {}", c, reading);
                            }
                            OutputFormat::Json => {
                                let live = LiveReading {
                                    time: Local::now(),
                                    reading: &reading,
                                };
                                let json = serde_json::to_string_pretty(&live)
                                    .map_err(io::Error::from)?;
                                println!("{}", json);
                            }
                            OutputFormat::Csv => {
                                let writer = csv_output
                                    .get_or_insert_with(|| csv::Writer::from_writer(io::stdout()));
                                writer.serialize(&reading).map_err(io::Error::from)?;
                                writer.flush()?;
                            }
                        }

                        if let Some(binout) = &mut fifo {
                            binout.write_f64::<LittleEndian>(
                                reading.main_number().unwrap_or(f64::NAN),
                            )?;
                            binout.write_f64::<LittleEndian>(
                                reading.secondary_number().unwrap_or(f64::NAN),
                            )?;
                        }
                    }
                    Err(err) => {
                        eprintln!("Error: {}", err);
                    }
                }

                if !endless_loop {
                    break;
                }
                tokio::time::sleep(interval).await;
                c += 1;
            }
        }

        Some(("log", args)) => {
            let interval = interval_arg(args, "time")?;
            let out_name = args.get_one::<PathBuf>("out").cloned().unwrap_or_else(|| {
                PathBuf::from(format!(
                    "BM869s_{}.csv",
                    Local::now().format("%Y%m%d%H%M%S")
                ))
            });
            log::info!("Logging to {}", out_name.display());
            log_readings(&mut device, &out_name, interval).await?;
        }

        _ => {
            return Err(std::io::Error::new(
                ErrorKind::Unsupported,
                "Unsupported command line argument",
            )
            .into());
        }
    }

    Ok(())
}

/// Poll the meter every `interval` and append each reading to a CSV file.
///
/// Runs until Ctrl-C. A missed reading is reported and skipped, all other
/// errors end the log.
async fn log_readings(device: &mut Device, out_name: &Path, interval: Duration) -> Result<()> {
    let output = BufWriter::new(File::create(out_name)?);
    let mut wtr = csv::Writer::from_writer(output);

    let start = Instant::now();
    loop {
        let now = start.elapsed();
        let reading = tokio::select! {
            reading = device.reading() => reading,
            _ = tokio::signal::ctrl_c() => break,
        };
        match reading {
            Ok(reading) => {
                let record = LogRecord::new(now, &reading);
                wtr.serialize(&record).map_err(io::Error::from)?;
                wtr.flush()?;
                println!("{}", record);
            }
            Err(ProtoError::Timeout(timeout)) => {
                log::warn!("No reading within {:?}, skipped", timeout);
            }
            Err(err) => return Err(err),
        }

        let elapsed = start.elapsed() - now;
        if elapsed < interval {
            tokio::select! {
                _ = tokio::time::sleep(interval - elapsed) => {}
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    wtr.flush()?;
    log::info!("Logging stopped after {:.1} s", start.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading {
            main_value: "1.23450".to_string(),
            main_unit: "DC V".to_string(),
            secondary_value: "    ".to_string(),
            secondary_unit: String::new(),
        }
    }

    #[test]
    fn test_log_record_line() {
        let reading = reading();
        let record = LogRecord::new(Duration::from_millis(2340), &reading);
        assert_eq!(record.to_string(), "  2.3,1.23450,DC V,    ,");
    }

    #[test]
    fn test_log_csv_header() {
        let reading = reading();
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(LogRecord::new(Duration::from_secs(12), &reading))
            .expect("serialize");
        wtr.flush().expect("flush");
        let data = String::from_utf8(wtr.get_ref().clone()).expect("utf8");
        let mut lines = data.lines();
        assert_eq!(
            lines.next(),
            Some("Time[S],Main,Main unit,Secondary,Secondary Unit")
        );
        assert_eq!(lines.next(), Some(" 12.0,1.23450,DC V,    ,"));
    }
}
