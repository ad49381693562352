//! Filewatch - watch a directory and print delivered events.

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use filewatch::{
    ConfigLoader, DeliveredEvent, FileEventKind, FileWatchConsumer, HashStrategy, WatchConfig,
};

#[derive(Parser)]
#[command(
    name = "filewatch",
    about = "Watch a directory and print filesystem events",
    version
)]
struct Cli {
    /// Directory to watch. Falls back to a .filewatch.toml config file.
    path: Option<PathBuf>,

    /// Comma-separated event kinds to deliver (CREATE,MODIFY,DELETE).
    #[arg(long, value_delimiter = ',')]
    events: Vec<FileEventKind>,

    /// Do not watch subdirectories.
    #[arg(long)]
    no_recursive: bool,

    /// Do not create the watch root if it is missing.
    #[arg(long)]
    no_auto_create: bool,

    /// Ant-style include pattern relative to the root (e.g. "**/*.csv").
    #[arg(long)]
    include: Option<String>,

    /// Queue capacity; omit for effectively unbounded.
    #[arg(long)]
    queue_size: Option<usize>,

    /// Delivery worker thread count.
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Native watch poll thread count.
    #[arg(long, default_value_t = 1)]
    poll_threads: usize,

    /// Disable duplicate-notification suppression.
    #[arg(long)]
    no_hashing: bool,

    /// Use the last-modified time instead of a content hash for dedup.
    #[arg(long, conflicts_with = "no_hashing")]
    mtime_hash: bool,

    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_config(cli: &Cli) -> Result<WatchConfig, String> {
    if let Some(path) = &cli.path {
        let mut config = WatchConfig::new(path.clone());
        if !cli.events.is_empty() {
            config.events = cli.events.iter().copied().collect();
        }
        config.recursive = !cli.no_recursive;
        config.auto_create = !cli.no_auto_create;
        config.ant_include = cli.include.clone();
        config.queue_size = cli.queue_size;
        config.concurrent_consumers = cli.workers;
        config.poll_threads = cli.poll_threads;
        config.use_file_hashing = !cli.no_hashing;
        if cli.mtime_hash {
            config.file_hasher = HashStrategy::ModifiedTime;
        }
        return Ok(config);
    }

    match ConfigLoader::new().load() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Err("No path given and no .filewatch.toml found".to_string()),
        Err(error) => Err(error.to_string()),
    }
}

fn print_event(event: &DeliveredEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::warn!(%error, "Failed to serialize event"),
        }
        return;
    }

    let kind = match event.kind {
        FileEventKind::Create => event.kind.green().to_string(),
        FileEventKind::Modify => event.kind.yellow().to_string(),
        FileEventKind::Delete => event.kind.red().to_string(),
    };
    println!("{kind:>6}  {}", event.relative_path.display());
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let json = cli.json;
    let (tx, rx) = crossbeam_channel::unbounded::<DeliveredEvent>();
    let consumer = FileWatchConsumer::new(config, move |event| {
        tx.send(event).map_err(|e| e.to_string())?;
        Ok(())
    });

    if let Err(error) = consumer.start() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    tracing::info!(
        root = %consumer.root().unwrap_or_default().display(),
        "Watching (Ctrl-C to stop)"
    );

    // The workers feed the channel; this thread only prints. Ctrl-C tears
    // the process down, so no drain is attempted.
    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(event) => print_event(&event, json),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
