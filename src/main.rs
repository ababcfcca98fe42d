use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Stderr, Stdout};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use access_color::event::{AsyncEvent, SyncEvent};
use access_color::{
    AccessOutcome, AsyncAccessLogger, ColorChoice, LoggerConfig, SyncAccessLogger, WriterSink,
};

type StdSink = WriterSink<Stdout, Stderr>;

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
enum Flavor {
    #[value(help = "Named atoms, e.g. '%(h)s \"%(r)s\" %(s)s'")]
    Sync,
    #[value(help = "Directives, e.g. '%a \"%r\" %s %{User-Agent}i'")]
    Async,
}

#[derive(Parser)]
#[command(name = "access-color")]
#[command(about = "Replay HTTP access events as status-colored access log lines")]
#[command(version)]
struct Args {
    /// Input file with one JSON event per line (default: stdin)
    #[arg(value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Event shape and format language
    #[arg(long, value_enum, default_value = "sync")]
    flavor: Flavor,

    /// Access log format (overrides the config file)
    #[arg(long)]
    format: Option<String>,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Override the color of a status category, e.g. 2=blue or 5=red+bold
    #[arg(long = "status-color", value_name = "DIGIT=STYLE", action = ArgAction::Append)]
    status_colors: Vec<String>,

    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    config_file: Option<PathBuf>,

    /// Append structured metadata as JSON after each line
    #[arg(long)]
    extra: bool,

    /// Stop at the first event that cannot be parsed
    #[arg(long)]
    fail_fast: bool,
}

impl Args {
    fn build_config(&self) -> anyhow::Result<LoggerConfig> {
        let mut config = match &self.config_file {
            Some(path) => LoggerConfig::load(path)
                .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
            None => LoggerConfig::default(),
        };

        // Output always goes to stdout.
        if config.access_log.is_none() {
            config.access_log = Some("-".to_string());
        }

        if let Some(format) = &self.format {
            match self.flavor {
                Flavor::Sync => config.access_log_format = format.clone(),
                Flavor::Async => config.async_log_format = format.clone(),
            }
        }

        if self.color {
            config.color = ColorChoice::Always;
        } else if self.no_color {
            config.color = ColorChoice::Never;
        }

        for entry in &self.status_colors {
            config.status_colors.apply_override(entry)?;
        }
        Ok(config)
    }
}

enum Replayer {
    Sync(SyncAccessLogger<StdSink>),
    Async(AsyncAccessLogger<StdSink>),
}

impl Replayer {
    fn new(flavor: Flavor, config: LoggerConfig, sink: StdSink) -> Self {
        match flavor {
            Flavor::Sync => Replayer::Sync(SyncAccessLogger::new(config, sink)),
            Flavor::Async => Replayer::Async(AsyncAccessLogger::new(&config, sink)),
        }
    }

    fn replay(&self, line: &str) -> Result<AccessOutcome, serde_json::Error> {
        Ok(match self {
            Replayer::Sync(logger) => {
                let event: SyncEvent = serde_json::from_str(line)?;
                logger.access(&event.response, &event.request, &event.environ, event.request_time)
            }
            Replayer::Async(logger) => {
                let event: AsyncEvent = serde_json::from_str(line)?;
                logger.log(&event.request, &event.response, event.elapsed)
            }
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ACCESS_COLOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(0) => {}
        Ok(failures) => {
            tracing::debug!(failures, "Finished with failures");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Replay every event, returning how many could not be parsed or formatted.
fn run(args: Args) -> anyhow::Result<usize> {
    let config = args.build_config()?;
    let sink = WriterSink::new(io::stdout(), io::stderr()).with_extra(args.extra);
    let replayer = Replayer::new(args.flavor, config, sink);

    let input: Box<dyn BufRead> = match &args.input_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut failures = 0;
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_number))?;
        if line.trim().is_empty() {
            continue;
        }

        match replayer.replay(&line) {
            Ok(AccessOutcome::Failed(_)) => failures += 1,
            Ok(_) => {}
            Err(e) if args.fail_fast => bail!("Invalid event on line {}: {}", line_number, e),
            Err(e) => {
                tracing::warn!(line = line_number, error = %e, "Skipping unparseable event");
                failures += 1;
            }
        }
    }

    Ok(failures)
}
