use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

mod app;
mod cli;
mod config;
mod entry;
mod error;
mod logger;
mod storage;
mod store;
mod tracker;
mod validate;

use crate::app::Model;
use crate::storage::SqliteStorage;
use crate::store::{JobStore, Store};
use crate::tracker::Tracker;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI application (default)
    Tui,
    /// Print recorded applications
    List {
        /// Column to sort by (company, position, status, date)
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending instead of ascending
        #[arg(long, requires = "sort")]
        desc: bool,
    },
    /// Record a new application
    Add {
        #[arg(long)]
        company: String,
        #[arg(long)]
        position: String,
        /// One of: Applied, Interview, Offer, Rejected
        #[arg(long)]
        status: String,
        /// Date applied as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Change fields of an existing application
    Edit {
        id: u64,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove all recorded applications from local storage
    Clear,
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)?;
    Ok(())
}

async fn run_tui<S: Store>(tracker: Tracker<S>, app_config: config::AppConfig) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut model = Model::new(tracker, app_config);
    let model_result = model.run(&mut terminal).await;

    let _ = restore_terminal();
    if let Err(err) = model_result {
        eprintln!("Error: {:?}", err);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));

    let args = Args::parse();

    let app_dir = config::get_app_dir()?;
    if let Err(e) = logger::init(&app_dir) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }
    let app_config = config::load_config(&app_dir);
    logger::log(&format!("start: {} in {:?}", config::APP_VERSION, app_dir));

    let storage = SqliteStorage::open(&config::storage_path(&app_dir))
        .context("Failed to open local storage")?;
    let store = JobStore::new(storage, &app_config.general.storage_key);
    let mut tracker = Tracker::new(store, app_config.settings());
    let today = Local::now().date_naive();

    match args.command {
        Some(Commands::List { sort, desc }) => {
            if let Some(column) = sort {
                cli::sort_by(&mut tracker, &column, desc)?;
            }
            println!("{}", cli::format_table(&tracker));
        }
        Some(Commands::Add {
            company,
            position,
            status,
            date,
        }) => {
            let id = cli::add(&mut tracker, company, position, status, date, today)?;
            println!("Recorded application {}.", id);
        }
        Some(Commands::Edit {
            id,
            company,
            position,
            status,
            date,
        }) => {
            let args = cli::EditArgs {
                company,
                position,
                status,
                date,
            };
            cli::edit(&mut tracker, id, args, today)?;
            println!("Updated application {}.", id);
        }
        Some(Commands::Clear) => {
            if tracker.clear() {
                println!("Local storage cleared.");
            } else if let Some(notice) = tracker.take_notice() {
                anyhow::bail!(notice.text);
            }
        }
        None | Some(Commands::Tui) => {
            run_tui(tracker, app_config).await?;
        }
    }

    Ok(())
}
