//! `mangashelf` command-line front end.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mangashelf_core::{AppPaths, DATA_DIR_ENV, Shelf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "mangashelf",
    version,
    about = "Browse a local manga library and track reading progress"
)]
struct Cli {
    /// Directory holding settings and reading history
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the manga in the library folder
    Scan {
        /// Library folder to scan instead of the configured one
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// List the chapters of one manga
    Chapters { manga: PathBuf },
    /// Record a page event for a chapter
    Progress {
        manga: PathBuf,
        chapter: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long)]
        total: u32,
    },
    /// Mark a chapter of an already-started manga as read
    MarkRead { manga: PathBuf, chapter: PathBuf },
    /// Show where to continue reading a manga
    Resume { manga: PathBuf },
    /// Inspect or clear reading history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Inspect or change viewer settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List the subfolders the folder picker would offer
    Browse {
        /// Folder to open instead of the configured library folder
        dir: Option<PathBuf>,
        /// Save the browsed folder as the library folder
        #[arg(long)]
        select: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Every manga with history, most recently read first
    Recent,
    /// Full history of one manga
    Show { manga: PathBuf },
    /// Clear one manga's history, or everything
    Clear {
        #[arg(long)]
        manga: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        #[arg(long)]
        show_page_indicator: Option<bool>,
        /// Gap between pages in pixels
        #[arg(long)]
        distance: Option<u32>,
        /// Default library folder
        #[arg(long)]
        library: Option<PathBuf>,
    },
    /// Restore the built-in defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mangashelf=debug"
    } else {
        "mangashelf=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let paths = AppPaths::resolve(cli.data_dir)?;
    let shelf = Shelf::open(&paths).await?;
    let out = commands::Output { json: cli.json };

    match cli.command {
        Command::Scan { root } => commands::scan(&shelf, out, root).await,
        Command::Chapters { manga } => {
            commands::chapters(&shelf, out, manga).await
        }
        Command::Progress {
            manga,
            chapter,
            page,
            total,
        } => commands::progress(&shelf, out, manga, chapter, page, total).await,
        Command::MarkRead { manga, chapter } => {
            commands::mark_read(&shelf, manga, chapter).await
        }
        Command::Resume { manga } => commands::resume(&shelf, out, manga).await,
        Command::History { action } => match action {
            HistoryAction::Recent => {
                commands::history_recent(&shelf, out).await
            }
            HistoryAction::Show { manga } => {
                commands::history_show(&shelf, out, manga).await
            }
            HistoryAction::Clear { manga } => {
                commands::history_clear(&shelf, manga).await
            }
        },
        Command::Settings { action } => match action {
            SettingsAction::Show => commands::settings_show(&shelf, out).await,
            SettingsAction::Set {
                show_page_indicator,
                distance,
                library,
            } => {
                commands::settings_set(
                    &shelf,
                    out,
                    show_page_indicator,
                    distance,
                    library,
                )
                .await
            }
            SettingsAction::Reset => {
                commands::settings_reset(&shelf, out).await
            }
        },
        Command::Browse { dir, select } => {
            commands::browse(&shelf, out, dir, select).await
        }
    }
}
