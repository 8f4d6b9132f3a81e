//! flipcache - cached terminal views over the renovation tracker backend.
//!
//! Runs the sync layer from a shell: load the project list, dashboard or a
//! project's detail, queue quick status/priority edits, or keep the list
//! refreshing until interrupted.

mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flipcache_core::{
    spawn_refresh_loop, Config, MutationField, RefreshEvent, SyncOrchestrator, Visibility,
};

/// Buffered refresh events before the loop waits on the printer
const REFRESH_EVENT_BUFFER: usize = 16;

const USAGE: &str = "\
Usage: flipcache [--json] [--log-file <path>] <command>

Commands:
  projects                              List projects with spend and room counts
  dashboard                             Portfolio totals
  show <id>                             Project detail with budget breakdown
  set <id> <status|priority> <value>... Queue one or more field edits
  watch                                 Refresh the project list until Ctrl-C
  stats                                 Load the project list and report cache contents

Environment:
  RUST_LOG                   Log filter (default: warn)
  FLIPCACHE_BACKEND_URL      Talk to an HTTP backend bridge at this URL
  FLIPCACHE_BACKEND_PROGRAM  Tracker CLI program to run
  FLIPCACHE_BACKEND_DIR      Working directory for the tracker CLI";

#[derive(Debug, PartialEq)]
enum Command {
    Projects,
    Dashboard,
    Show(i64),
    Set(Vec<(i64, MutationField, String)>),
    Watch,
    Stats,
    Help,
}

#[derive(Debug, PartialEq)]
struct Cli {
    json: bool,
    log_file: Option<PathBuf>,
    command: Command,
}

fn parse_id(s: &str) -> Result<i64> {
    s.parse()
        .with_context(|| format!("Invalid project id: {}", s))
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut json = false;
    let mut log_file = None;
    let mut rest = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--log-file" => {
                let path = iter.next().context("--log-file needs a path")?;
                log_file = Some(PathBuf::from(path));
            }
            "-h" | "--help" => rest.insert(0, "help".to_string()),
            _ => rest.push(arg.clone()),
        }
    }

    let command = match rest.first().map(String::as_str) {
        None | Some("help") => Command::Help,
        Some("projects") => Command::Projects,
        Some("dashboard") => Command::Dashboard,
        Some("watch") => Command::Watch,
        Some("stats") => Command::Stats,
        Some("show") => match rest.get(1) {
            Some(id) => Command::Show(parse_id(id)?),
            None => bail!("show needs a project id"),
        },
        Some("set") => {
            let triples = &rest[1..];
            if triples.is_empty() || triples.len() % 3 != 0 {
                bail!("set takes <id> <field> <value> triples");
            }
            let mut edits = Vec::with_capacity(triples.len() / 3);
            for chunk in triples.chunks(3) {
                let id = parse_id(&chunk[0])?;
                let field = MutationField::parse(&chunk[1])
                    .with_context(|| format!("Unknown field: {} (expected status or priority)", chunk[1]))?;
                edits.push((id, field, chunk[2].clone()));
            }
            Command::Set(edits)
        }
        Some(other) => bail!("Unknown command: {}", other),
    };

    Ok(Cli {
        json,
        log_file,
        command,
    })
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
/// With a log file, output goes there instead of stderr; keep the guard
/// alive until exit so buffered lines are flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct EditOutcome {
    id: i64,
    field: MutationField,
    value: String,
    ok: bool,
    error: Option<String>,
}

async fn run_set(
    sync: &SyncOrchestrator,
    edits: Vec<(i64, MutationField, String)>,
    json: bool,
) -> Result<()> {
    // Spawn every edit before awaiting any, so they share one debounce window.
    let handles: Vec<_> = edits
        .into_iter()
        .map(|(id, field, value)| {
            let sync = sync.clone();
            tokio::spawn(async move {
                let result = sync.update_field(id, field, &value).await;
                (id, field, value, result)
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let (id, field, value, result) = handle.await.context("Edit task panicked")?;
        outcomes.push(EditOutcome {
            id,
            field,
            value,
            ok: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        });
    }

    let failed = outcomes.iter().filter(|o| !o.ok).count();
    if json {
        print_json(&outcomes)?;
    } else {
        for o in &outcomes {
            match &o.error {
                None => println!("project {}: {} -> {}", o.id, o.field, o.value),
                Some(e) => println!("project {}: {} -> {} FAILED: {}", o.id, o.field, o.value, e),
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} edits failed", failed, outcomes.len());
    }
    Ok(())
}

async fn run_watch(sync: SyncOrchestrator, json: bool) -> Result<()> {
    let period = sync.config().refresh_interval();
    let (_visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (events_tx, mut events_rx) = mpsc::channel(REFRESH_EVENT_BUFFER);

    let cache = sync.cache().clone();
    let handle = spawn_refresh_loop(sync, period, visibility_rx, shutdown_rx, events_tx);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping refresh loop");
                let _ = shutdown_tx.send(true);
                break;
            }
            event = events_rx.recv() => match event {
                Some(RefreshEvent::Projects(projects)) => {
                    if json {
                        println!("{}", serde_json::to_string(&projects)?);
                    } else {
                        println!("{}", output::refresh_line(chrono::Local::now(), &projects));
                    }
                }
                Some(RefreshEvent::Error(e)) => eprintln!("Refresh failed: {}", e),
                None => break,
            }
        }
    }

    let runs = handle.await.context("Refresh loop panicked")?;
    cache.clear();
    info!(runs, "Watch finished");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if cli.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let backend = config.sync.backend.build()?;
    let sync = SyncOrchestrator::with_backend(backend, config.sync.clone());

    match cli.command {
        Command::Projects => {
            let projects = sync.load_projects().await?;
            if cli.json {
                print_json(&projects)?;
            } else {
                print!("{}", output::project_table(&projects));
            }
        }
        Command::Dashboard => {
            let summary = sync.load_dashboard().await?;
            if cli.json {
                print_json(&summary)?;
            } else {
                print!("{}", output::dashboard(&summary));
            }
        }
        Command::Show(id) => {
            let detail = sync.load_project_detail(id).await?;
            if cli.json {
                print_json(&detail)?;
            } else {
                print!("{}", output::project_detail(&detail));
            }
        }
        Command::Set(edits) => run_set(&sync, edits, cli.json).await?,
        Command::Watch => run_watch(sync, cli.json).await?,
        Command::Stats => {
            sync.load_projects().await?;
            let stats = sync.cache_stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("{} cached entries", stats.entry_count);
                for key in &stats.keys {
                    match sync.cache().time_to_live(key.as_str()) {
                        Some(ttl) => println!("  {:<20} expires in {}s", key, ttl.as_secs()),
                        None => println!("  {}", key),
                    }
                }
            }
        }
        Command::Help => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {:#}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let _guard = init_tracing(cli.log_file.as_deref())?;
    info!(command = ?cli.command, "flipcache starting");

    run(cli).await
}
