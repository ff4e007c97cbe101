use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::leisure::LeisureKind;
use crate::prefs::{ColorMode, Theme};
use crate::task::TaskCategory;
use crate::view::{CategoryFilter, Page};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "questlog",
    version,
    about = "Daily tasks, weekly targets and a leisure log in your terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config key for this run (repeatable)
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub overrides: Vec<KeyVal>,

    /// Config file (defaults to $QUESTLOGRC or ~/.questlogrc)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides data.location)
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Header, quote, stats, active tasks and weekly targets (default)
    Dashboard,

    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(short = 'c', long = "category", default_value = "work")]
        category: TaskCategory,
    },

    /// Replace a task's text and, optionally, its category
    Edit {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(short = 'c', long = "category")]
        category: Option<TaskCategory>,
    },

    /// Mark a task completed
    Done { id: String },

    /// Mark a task incomplete (asks for confirmation)
    Fail {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Move a task back to active
    Reopen { id: String },

    /// Delete a task
    Delete { id: String },

    /// List tasks
    List {
        /// home, completed, incomplete, or leisure (alias all) for every task
        #[arg(short = 'p', long = "page", default_value = "home")]
        page: Page,
        #[arg(short = 'c', long = "category", default_value = "all")]
        category: CategoryFilter,
    },

    /// Task counts and completion percentage
    Stats,

    /// Weekly targets
    #[command(subcommand)]
    Target(TargetCommand),

    /// Log a movie, game session or TV session
    #[command(subcommand)]
    Log(LogCommand),

    /// Show the leisure logs
    Leisure {
        /// Only this log (movies, games or shows)
        kind: Option<LeisureKind>,
    },

    /// Show or change the theme
    Theme(ThemeArgs),

    /// Show or change the color mode
    Mode {
        /// dark, light or toggle
        value: Option<String>,
    },

    /// Fetch and print a motivational line
    Quote,

    /// Ask for task suggestions toward a goal (nothing is added)
    Suggest {
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,
    },

    /// Print every stored slot as JSON
    Export,

    /// Restore slots from a JSON export or a local-storage dump
    Import {
        /// Read from this file instead of stdin
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TargetCommand {
    /// Add a weekly target
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Check or uncheck a target
    Toggle { id: String },
    /// Remove a target
    Delete { id: String },
    /// List targets
    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LogCommand {
    /// Log a watched movie
    Movie {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Log a game session
    Game { title: String, hours: String },
    /// Log a TV session
    Show { title: String, hours: String },
}

#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    /// Theme to switch to (vaporwave, cyberpunk, fantasy)
    pub theme: Option<Theme>,
    /// Advance to the next theme
    #[arg(long = "cycle", conflicts_with = "theme")]
    pub cycle: bool,
}

pub enum ModeChange {
    Set(ColorMode),
    Toggle,
}

impl ModeChange {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().eq_ignore_ascii_case("toggle") {
            return Ok(ModeChange::Toggle);
        }
        raw.parse().map(ModeChange::Set)
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Joins positional words back into one string.
pub fn joined(words: &[String]) -> String {
    words.join(" ")
}
