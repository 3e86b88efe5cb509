//! `driftlog` command-line front-end.
//!
//! Subcommands: `log` (stdin lines to a file), `dump` (formatted dump),
//! `json` (JSON records), `count` (frame count), and `remix`
//! (time-ordered, filtered, byte-exact frame extraction across files).

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use driftlog_core::{
    ChannelPathWriter, ChannelReader, CodecRegistry, Filter, FilterSeeker, MultiChannelReader,
    PathScanner, PathSeeker, PlainText, Scan, SeekScan, SeekerGroup, Value, json,
};
use driftlog_proto::{format_timestamp, parse_timestamp};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Poll interval while following a growing file.
const FOLLOW_DELAY: Duration = Duration::from_millis(100);

/// Timestamped, channelized log files
#[derive(Parser, Debug)]
#[command(name = "driftlog")]
#[command(about = "Write, dump, and remix framed time-series log files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log timestamped plain-text messages from stdin
    Log {
        /// The file name to write
        path: PathBuf,

        /// The application name to log under
        application: String,

        /// The channel name to log under
        #[arg(short, long, default_value = "log")]
        channel: String,
    },

    /// Dump timestamped plain-text messages
    Dump {
        /// The file name to read
        path: PathBuf,

        /// Include frames from this channel pattern (app/channel, app/*,
        /// */channel, or a bare channel). May be repeated.
        #[arg(short, long = "channel")]
        channels: Vec<String>,

        /// Include only frames at or after this time
        /// (YYYY-MM-DDTHH:MM:SS[.n...], UTC)
        #[arg(short, long)]
        start: Option<String>,

        /// Include only frames before this time
        #[arg(short, long)]
        end: Option<String>,

        /// Continue dumping as the file grows
        #[arg(short, long)]
        follow: bool,
    },

    /// Dump messages as JSON records
    Json {
        /// The file name to read
        path: PathBuf,

        /// Include frames from this channel pattern. May be repeated.
        #[arg(short, long = "channel")]
        channels: Vec<String>,

        /// Include only frames at or after this time
        #[arg(short, long)]
        start: Option<String>,

        /// Include only frames before this time
        #[arg(short, long)]
        end: Option<String>,

        /// Continue dumping as the file grows
        #[arg(short, long)]
        follow: bool,
    },

    /// Count frames
    Count {
        /// The file name to read
        path: PathBuf,
    },

    /// Extract selected frames from one or more files, in time order
    Remix {
        /// Input file name(s)
        paths: Vec<PathBuf>,

        /// Output file name, or `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: String,

        /// Include frames from this channel pattern. May be repeated.
        #[arg(short, long = "channel")]
        channels: Vec<String>,

        /// Include only frames at or after this time
        #[arg(short, long)]
        start: Option<String>,

        /// Include only frames before this time
        #[arg(short, long)]
        end: Option<String>,
    },
}

/// Parse an optional time bound; `None` or unparsable means "no bound".
fn time_bound(input: Option<&str>) -> Option<u64> {
    input.and_then(parse_timestamp)
}

fn log(path: &Path, application: &str, channel: &str) -> Result<(), Box<dyn Error>> {
    let mut writer = ChannelPathWriter::create(path, application, channel, &PlainText, None)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        writer.write(&Value::from(line?), 0, false)?;
    }
    Ok(())
}

fn dump(
    path: &Path,
    channels: &[String],
    start: Option<&str>,
    end: Option<&str>,
    follow: bool,
) -> Result<(), Box<dyn Error>> {
    let start = time_bound(start);
    let end = time_bound(end);
    let filter = Filter::new(channels);

    let mut seeker = PathSeeker::open(path)?;
    if let Some(start) = start {
        seeker.seek_time(start);
    } else if follow {
        seeker.seek(SeekFrom::End(0))?;
    }

    let mut reader = ChannelReader::new(&mut seeker, &PlainText)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        let (value, source_timestamp, envelope) = match reader.read() {
            Ok(frame) => frame,
            Err(err) if err.is_eof() => {
                if follow {
                    thread::sleep(FOLLOW_DELAY);
                    continue;
                }
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if end.is_some_and(|end| source_timestamp > end) {
            break;
        }
        if !filter.matches(&envelope) {
            continue;
        }

        if let Value::Text(text) = value {
            writeln!(out, "{} {}", format_timestamp(source_timestamp), text)?;
        }
    }
    Ok(())
}

fn dump_json(
    path: &Path,
    channels: &[String],
    start: Option<&str>,
    end: Option<&str>,
    follow: bool,
) -> Result<(), Box<dyn Error>> {
    let start = time_bound(start);
    let end = time_bound(end);
    let filter = Filter::new(channels);

    let mut seeker = PathSeeker::open(path)?;
    if let Some(start) = start {
        seeker.seek_time(start);
    } else if follow {
        seeker.seek(SeekFrom::End(0))?;
    }

    let mut reader = MultiChannelReader::new(&mut seeker, CodecRegistry::standard());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        let (value, source_timestamp, envelope) = match reader.read() {
            Ok(frame) => frame,
            Err(err) if err.is_eof() => {
                if follow {
                    thread::sleep(FOLLOW_DELAY);
                    continue;
                }
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if end.is_some_and(|end| source_timestamp > end) {
            break;
        }
        if !filter.matches(&envelope) {
            continue;
        }

        writeln!(out, "{}", json::frame_record(&value.to_json(), source_timestamp, &envelope))?;
    }
    Ok(())
}

fn count(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut scanner = PathScanner::open(path)?;

    let mut frames: u64 = 0;
    while scanner.next() {
        scanner.skip(1)?;
        frames += 1;
    }

    writeln!(io::stdout().lock(), "{frames}")?;
    Ok(())
}

fn remix(
    paths: &[PathBuf],
    output: &str,
    channels: &[String],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let start = time_bound(start);
    let end = time_bound(end);

    let mut out: Box<dyn Write> = if output == "-" {
        Box::new(io::stdout().lock())
    } else {
        Box::new(File::create(output)?)
    };
    let mut info = io::stderr().lock();

    let mut group = SeekerGroup::<PathSeeker>::open_paths(paths)?;
    let mut seeker = FilterSeeker::new(&mut group, Filter::new(channels));

    if let Some(start) = start {
        seeker.seek_time(start);
    }

    let mut frames: u64 = 0;
    while let Some((source_timestamp, envelope)) = seeker.peek_envelope() {
        if end.is_some_and(|end| source_timestamp > end) {
            break;
        }

        seeker.copy_frame(&mut out)?;
        frames += 1;

        writeln!(
            info,
            "{} {} {}",
            format_timestamp(source_timestamp),
            envelope.identifier,
            envelope.encoding
        )?;
    }

    writeln!(info, "{frames} frames copied")?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driftlog=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    match &args.command {
        Command::Log { path, application, channel } => log(path, application, channel),
        Command::Dump { path, channels, start, end, follow } => {
            dump(path, channels, start.as_deref(), end.as_deref(), *follow)
        }
        Command::Json { path, channels, start, end, follow } => {
            dump_json(path, channels, start.as_deref(), end.as_deref(), *follow)
        }
        Command::Count { path } => count(path),
        Command::Remix { paths, output, channels, start, end } => {
            remix(paths, output, channels, start.as_deref(), end.as_deref())
        }
    }
}
