//! Gear Runtime
//!
//! Headless inventory runner. Loads the character's items, lays them out on
//! the grid and reads drag, toggle and rotate commands from stdin. Every
//! committed change is written to the store in the background.
//!
//! Run with: cargo run -p gear_runtime -- --config gear.toml
//!       or: cargo run --bin gear

mod command;
mod config;
mod session;
mod surface;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use gear_inventory::{ItemRecord, TransferEngine, ViewAdapter};
use gear_sync::{BatchSink, HttpBackend, NullSink, SyncClient};
use parking_lot::Mutex;

use crate::command::Command;
use crate::config::GearConfig;
use crate::session::{Flow, Session, SharedSink};
use crate::surface::TextSurface;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// `--config <path>` or `--config=<path>`
fn config_arg(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            return iter.next().map(String::as_str);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path);
        }
    }
    None
}

fn load_items(config: &GearConfig) -> Result<Vec<ItemRecord>, Box<dyn Error>> {
    let Some(path) = &config.inventory.items else {
        log::warn!("No item file configured, starting empty");
        return Ok(Vec::new());
    };

    let json = std::fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path, e))?;
    let records = ItemRecord::parse_list(&json).map_err(|e| format!("Bad item file {}: {}", path, e))?;
    log::info!("Read {} item record(s) from {}", records.len(), path);
    Ok(records)
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = GearConfig::load(config_arg(&args))?;
    config.print_summary();

    let records = load_items(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let client = if config.sync.enabled {
        let backend = HttpBackend::new(&config.sync_settings())?;
        Some(Arc::new(Mutex::new(SyncClient::new(
            Arc::new(backend),
            runtime.handle().clone(),
        ))))
    } else {
        None
    };
    let sink: Box<dyn BatchSink> = match &client {
        Some(client) => Box::new(SharedSink(Arc::clone(client))),
        None => Box::new(NullSink),
    };

    let (engine, report) = TransferEngine::from_records(config.layout(), records, sink)?;
    for name in &report.overflow {
        println!("No inventory space for {}", name);
    }

    let mut view = ViewAdapter::new(engine, TextSurface::new(), config.metrics());
    view.redraw();
    let mut session = Session::new(view, client);

    for line in session.execute(Command::Show).1 {
        println!("{}", line);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "gear> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{} (try 'help')", e);
                continue;
            }
        };

        let (flow, out) = session.execute(command);
        for line in out {
            println!("{}", line);
        }
        if flow == Flow::Quit {
            break;
        }
    }

    log::info!("Waiting for pending writes");
    for line in session.flush(&runtime) {
        println!("{}", line);
    }
    let unsaved = session.failed().len();
    if unsaved > 0 {
        log::warn!("{} change(s) were not saved", unsaved);
    }

    Ok(())
}
