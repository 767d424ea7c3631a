//! Zoo Node
//!
//! Loads a roster into a zoo with one enclosure per species, runs the daily
//! routine until Ctrl-C, then exports every animal sorted by the chosen
//! order.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use zoo_core::{
    AnimalOrder, FanOutSink, FileSink, RosterFormat, SharedSink, Timing, TracingSink, Zoo,
};

/// Zoo simulation node
#[derive(Parser, Debug)]
#[command(name = "zoo-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Zoo name
    #[arg(short, long, default_value = "City Zoo")]
    name: String,

    /// Roster to populate the zoo from
    #[arg(short, long, default_value = "zoopark.json")]
    roster: PathBuf,

    /// Where to export all animals on shutdown (repeatable)
    #[arg(short, long, default_values = ["zoo_all_animals.json", "zoo_all_animals.xml"])]
    output: Vec<PathBuf>,

    /// Roster and export format (json, xml); by file extension when omitted
    #[arg(short, long)]
    format: Option<RosterFormat>,

    /// Event log file
    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,

    /// Only log events through tracing
    #[arg(long)]
    no_log_file: bool,

    /// Keeper names (repeatable)
    #[arg(short, long = "keeper", default_values_t = [String::from("John"), String::from("Alice")])]
    keepers: Vec<String>,

    /// Length of one simulation time unit in milliseconds
    #[arg(long, default_value = "1000")]
    time_unit_ms: u64,

    /// Daily routine period in seconds
    #[arg(long, default_value = "60")]
    routine_period_secs: u64,

    /// Export order (name, age, species, hunger)
    #[arg(long, default_value = "name")]
    sort_by: AnimalOrder,

    /// Log level or tracing filter directive
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    info!("Zoo node \"{}\" starting", args.name);

    let mut sinks = FanOutSink::new().with(Arc::new(TracingSink));
    if !args.no_log_file {
        match FileSink::open(&args.log_file) {
            Ok(file) => {
                info!("Writing events to {:?}", file.path());
                sinks = sinks.with(Arc::new(file));
            }
            Err(e) => warn!("Cannot open log file {:?}: {}", args.log_file, e),
        }
    }
    let sink: SharedSink = Arc::new(sinks);

    let timing = Timing::default()
        .with_unit(Duration::from_millis(args.time_unit_ms))
        .with_routine_period(Duration::from_secs(args.routine_period_secs));
    let zoo = Arc::new(Zoo::with_standard_layout(args.name.clone(), timing, sink.clone())?);

    for name in &args.keepers {
        zoo.add_keeper(zoo.create_keeper(name.clone()));
    }
    info!("Hired {} keepers", zoo.keepers().len());

    let format_for = |path: &PathBuf| args.format.unwrap_or_else(|| RosterFormat::from_path(path));

    let roster = format_for(&args.roster).store(&args.roster);
    if args.roster.exists() {
        match roster.load() {
            Ok(entries) => {
                zoo.populate(&entries);
            }
            Err(e) => {
                error!("Cannot read roster {:?}: {}", args.roster, e);
                sink.log(&format!("System error: {}", e));
            }
        }
    } else {
        warn!("Roster {:?} not found, starting with an empty zoo", args.roster);
    }

    for enclosure in zoo.enclosures().iter().filter(|e| !e.is_empty()) {
        info!("{}", enclosure);
    }

    zoo.start_routine()?;
    info!("Running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    zoo.shutdown();

    let order = args.sort_by;
    let records = zoo.export(move |a, b| order.compare(a, b)).await?;
    for path in &args.output {
        format_for(path).store(path).save(zoo.name(), &records)?;
    }
    info!("Exported {} animals", records.len());

    Ok(())
}
