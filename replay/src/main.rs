use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use clap::error::ErrorKind;
use common::{
    DEFAULT_MAX_DISTANCE_TO_ROUTE_M, DEFAULT_MAX_GAP_M, DEFAULT_MAX_PARTICIPANT_AGE_SECS,
    DEFAULT_STATISTICS_SEGMENTS, Procession, ProcessionConfig, Route, RouteError, RouteStore,
    TimeParseError, parse_date_time,
};
use replay::batch::BatchRunner;
use replay::clock::Pacing;
use replay::log::{LogFilePlayer, LogReader};
use replay::sink::{LocalProcessionSink, ParticipantSink, RemoteSink};
use replay::speed::ConstantSpeedPlayer;
use replay::stats::{HeadTailWriter, ProcessionLengthWriter, file_stem_for};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Upper bound for second-valued flags, a hundred years
const MAX_SECONDS: i64 = 100 * 365 * 86_400;

#[derive(Parser, Debug)]
#[command(
    name = "bladenight-replay",
    version,
    about = "Replay recorded or synthesized Bladenight participant positions"
)]
struct Args {
    /// Input log file, or a directory of log files
    #[arg(long, value_name = "LOGFILE", env = "BLADENIGHT_REPLAY_FILE")]
    file: Option<PathBuf>,

    /// Start time ("yyyy-mm-ddThh:mm")
    #[arg(long, value_name = "STARTTIME", value_parser = parse_cli_date, env = "BLADENIGHT_REPLAY_FROMTIME")]
    fromtime: Option<DateTime<Utc>>,

    /// End time ("yyyy-mm-ddThh:mm")
    #[arg(long, value_name = "ENDTIME", value_parser = parse_cli_date, env = "BLADENIGHT_REPLAY_TOTIME")]
    totime: Option<DateTime<Utc>>,

    /// Time lapse factor. 60 will for instance cause 1 real sec = 1 bladenight minute
    #[arg(long, value_name = "TIMELAPSE", env = "BLADENIGHT_REPLAY_TIMELAPSE")]
    timelapse: Option<f64>,

    /// Speed in km/h
    #[arg(long, value_name = "SPEED", env = "BLADENIGHT_REPLAY_SPEED")]
    speed: Option<f64>,

    /// Tracking server (e.g. ws://localhost:8081); without it positions feed a local procession
    #[arg(long, value_name = "URL", env = "BLADENIGHT_REPLAY_URL")]
    url: Option<String>,

    /// Directory of event files; replays the log once per confirmed event
    #[arg(long, value_name = "DIR", env = "BLADENIGHT_REPLAY_EVENTS_DIR")]
    events_dir: Option<PathBuf>,

    /// Directory of route files
    #[arg(long, value_name = "DIR", default_value = "routes", env = "BLADENIGHT_REPLAY_ROUTES_DIR")]
    routes_dir: PathBuf,

    /// Route name for local replays and synthesized participants
    #[arg(long, value_name = "ROUTE", env = "BLADENIGHT_REPLAY_ROUTE")]
    route: Option<String>,

    /// Number of synthesized participants
    #[arg(long, value_name = "COUNT", default_value_t = 1, env = "BLADENIGHT_REPLAY_COUNT")]
    count: usize,

    /// Seconds over which synthesized participants start
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 0,
        value_parser = clap::value_parser!(i64).range(0..=MAX_SECONDS),
        env = "BLADENIGHT_REPLAY_STARTPERIOD"
    )]
    startperiod: i64,

    /// Where statistics files are written
    #[arg(long, value_name = "DIR", default_value = ".", env = "BLADENIGHT_REPLAY_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Number of route segments for procession statistics
    #[arg(long, default_value_t = DEFAULT_STATISTICS_SEGMENTS, env = "BLADENIGHT_REPLAY_SEGMENTS")]
    segments: usize,

    /// Gap in metres that splits the procession
    #[arg(long, default_value_t = DEFAULT_MAX_GAP_M, env = "BLADENIGHT_REPLAY_MAX_GAP")]
    max_gap: f64,

    /// Seconds a participant stays valid without a new position
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_PARTICIPANT_AGE_SECS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SECONDS),
        env = "BLADENIGHT_REPLAY_MAX_AGE"
    )]
    max_age: i64,

    /// Maximum distance in metres between a position and the route
    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE_TO_ROUTE_M, env = "BLADENIGHT_REPLAY_MAX_DISTANCE")]
    max_distance: f64,

    /// Seconds of event time between statistics rows
    #[arg(
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SECONDS),
        env = "BLADENIGHT_REPLAY_CHECKPOINT_INTERVAL"
    )]
    checkpoint_interval: i64,

    /// Seconds of event time between synthesized positions
    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SECONDS),
        env = "BLADENIGHT_REPLAY_TICK"
    )]
    tick: i64,
}

/// What a run does, picked from the flags in order of precedence.
#[derive(Debug, PartialEq)]
enum Mode<'a> {
    Batch(&'a Path),
    LogFile(&'a Path),
    ConstantSpeed(f64),
    Idle,
}

/// Where replayed positions go.
#[derive(Debug, PartialEq)]
enum SinkTarget<'a> {
    Remote(&'a str),
    Local(&'a str),
}

impl Args {
    fn mode(&self) -> Mode<'_> {
        if let Some(events_dir) = &self.events_dir {
            Mode::Batch(events_dir)
        } else if let Some(file) = &self.file {
            Mode::LogFile(file)
        } else if let Some(speed) = self.speed {
            Mode::ConstantSpeed(speed)
        } else {
            Mode::Idle
        }
    }

    fn sink_target(&self) -> Result<SinkTarget<'_>> {
        if let Some(url) = &self.url {
            return Ok(SinkTarget::Remote(url));
        }
        let route = self
            .route
            .as_deref()
            .context("A local replay needs --route (or --url to send positions to a server)")?;
        Ok(SinkTarget::Local(route))
    }
}

fn parse_cli_date(value: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_date_time(value)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = usage_exit_code(&err);
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let result = run(args).await;
    std::process::exit(exit_code(&result));
}

/// Help and version requests succeed, every other parse failure exits with 1.
fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn is_route_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<RouteError>())
}

fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) if is_route_failure(err) => {
            error!("Failed to load route: {:#}", err);
            1
        }
        Err(err) => {
            error!("{:#}", err);
            1
        }
    }
}

async fn run(args: Args) -> Result<()> {
    match args.mode() {
        Mode::Batch(events_dir) => run_batch(&args, events_dir).await,
        Mode::LogFile(file) => run_log_file_player(&args, file).await,
        Mode::ConstantSpeed(speed) => run_constant_speed_player(&args, speed).await,
        Mode::Idle => {
            warn!("Nothing to do: pass --file, --speed or --events-dir");
            Ok(())
        }
    }
}

async fn run_batch(args: &Args, events_dir: &Path) -> Result<()> {
    let file = args
        .file
        .as_deref()
        .context("--events-dir needs the recorded log passed with --file")?;
    let entries = LogReader::read_path(file)?;

    let runner = BatchRunner::new(events_dir, &args.routes_dir, &args.output_dir)
        .with_config(procession_config(args))
        .with_checkpoint_interval(Duration::seconds(args.checkpoint_interval));
    let reports = runner.run(entries).await?;

    for report in &reports {
        info!(
            "{} {}: {} entries, {} checkpoint(s) -> {:?}",
            report.start, report.route, report.delivered, report.checkpoints, report.output_base
        );
    }
    info!("Processed {} event(s)", reports.len());
    Ok(())
}

async fn run_log_file_player(args: &Args, file: &Path) -> Result<()> {
    let entries = LogReader::read_path(file)?;
    let mut player = LogFilePlayer::new(entries);
    if let Some(from) = args.fromtime {
        player.set_from_date_time(from);
    }
    if let Some(to) = args.totime {
        player.set_to_date_time(to);
    }
    if let Some(factor) = args.timelapse {
        player.set_time_lapse_factor(factor)?;
    }

    let mut sink = build_sink(args).await?;
    let summary = player.replay(sink.as_mut()).await?;
    info!(
        "Replayed {} entries ({:?} - {:?})",
        summary.delivered, summary.first, summary.last
    );
    Ok(())
}

async fn run_constant_speed_player(args: &Args, speed: f64) -> Result<()> {
    let route_name = args
        .route
        .as_deref()
        .context("Synthesized participants need a --route to skate on")?;
    let route = load_route(&args.routes_dir, route_name)?;

    let start = args.fromtime.unwrap_or_else(Utc::now);
    let mut player = ConstantSpeedPlayer::new(route, speed, start)?;
    player.set_count(args.count)?;
    player.set_start_period(Duration::seconds(args.startperiod))?;
    player.set_tick(Duration::seconds(args.tick))?;

    let pacing = Pacing::time_lapse(args.timelapse.unwrap_or(1.0))?;
    let mut sink = build_sink(args).await?;
    let summary = player.play(sink.as_mut(), pacing).await?;
    info!("Sent {} synthesized position(s)", summary.delivered);
    Ok(())
}

async fn build_sink(args: &Args) -> Result<Box<dyn ParticipantSink>> {
    let route_name = match args.sink_target()? {
        SinkTarget::Remote(url) => return Ok(Box::new(RemoteSink::connect(url).await?)),
        SinkTarget::Local(route_name) => route_name,
    };

    let route = load_route(&args.routes_dir, route_name)?;
    let base = args.output_dir.join(file_stem_for(route.name()));
    info!("Replaying into a local procession on '{}', writing to {:?}", route.name(), base);

    let length_writer = ProcessionLengthWriter::create(&base, route.name())?;
    let head_tail_writer = HeadTailWriter::create(&base, route.name())?;
    let procession = Procession::new(route, procession_config(args));
    let sink = LocalProcessionSink::new(procession, Duration::seconds(args.checkpoint_interval))
        .with_writer(Box::new(length_writer))
        .with_writer(Box::new(head_tail_writer));
    Ok(Box::new(sink))
}

fn load_route(routes_dir: &Path, name: &str) -> Result<Route> {
    let store = RouteStore::new(routes_dir);
    store.load(name).map_err(|err| {
        if matches!(err, RouteError::UnknownRoute { .. }) {
            if let Ok(names) = store.names() {
                warn!("Routes available in {:?}: {}", routes_dir, names.join(", "));
            }
        }
        err.into()
    })
}

fn procession_config(args: &Args) -> ProcessionConfig {
    ProcessionConfig {
        max_participant_age: Duration::seconds(args.max_age),
        max_distance_to_route: args.max_distance,
        max_gap: args.max_gap,
        statistics_segments: args.segments,
        ..ProcessionConfig::default()
    }
}
