use std::fs;
use std::future::Future;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde_json::Value;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::cli::{Command, LogCommand, ModeChange, TargetCommand, ThemeArgs, joined};
use crate::config::Config;
use crate::leisure::LeisureKind;
use crate::quote::{self, GeminiClient, QuoteSettings, QuoteSource};
use crate::render::{Renderer, describe_entry, short_id};
use crate::state::{Action, AppState};
use crate::storage::KeyValueStore;
use crate::task::{TaskCategory, TaskStatus};
use crate::view::{CategoryFilter, Page};

#[instrument(skip(state, cfg, renderer, command))]
pub fn dispatch<S: KeyValueStore>(
    state: &mut AppState<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Dashboard => cmd_dashboard(state, cfg, renderer),
        Command::Add { text, category } => cmd_add(state, &joined(&text), category),
        Command::Edit { id, text, category } => cmd_edit(state, &id, &joined(&text), category),
        Command::Done { id } => cmd_set_status(state, &id, TaskStatus::Completed, true),
        Command::Fail { id, yes } => cmd_set_status(state, &id, TaskStatus::Incomplete, yes),
        Command::Reopen { id } => cmd_set_status(state, &id, TaskStatus::Active, true),
        Command::Delete { id } => cmd_delete(state, &id),
        Command::List { page, category } => cmd_list(state, renderer, page, category),
        Command::Stats => cmd_stats(state, renderer),
        Command::Target(sub) => cmd_target(state, renderer, sub),
        Command::Log(sub) => cmd_log(state, sub),
        Command::Leisure { kind } => renderer.print_leisure(state.leisure(), kind),
        Command::Theme(args) => cmd_theme(state, renderer, args),
        Command::Mode { value } => cmd_mode(state, renderer, value.as_deref()),
        Command::Quote => cmd_quote(cfg),
        Command::Suggest { goal } => cmd_suggest(cfg, &joined(&goal)),
        Command::Export => cmd_export(state),
        Command::Import { file } => cmd_import(state, file.as_deref()),
    }
}

fn run_async<T>(future: impl Future<Output = T>) -> anyhow::Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed building async runtime")?;
    Ok(runtime.block_on(future))
}

/// One worker so the quote fetch makes progress while the dashboard renders
/// on the calling thread.
fn background_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed building async runtime")
}

/// Spawns the quote fetch on `runtime` and returns where its result lands.
/// A client that could not be built reports the fallback line at once.
fn start_quote_fetch<Q>(
    runtime: &Runtime,
    client: anyhow::Result<Q>,
    timeout: Option<Duration>,
) -> mpsc::UnboundedReceiver<Action>
where
    Q: QuoteSource + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    match client {
        Ok(client) => {
            let _guard = runtime.enter();
            quote::spawn_quote_fetch(Arc::new(client), timeout, tx);
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "quote client unavailable; using fallback");
            let _ = tx.send(Action::QuoteLoaded(quote::FALLBACK_QUOTE.to_string()));
        }
    }
    rx
}

#[instrument(skip(state, cfg, renderer))]
fn cmd_dashboard<S: KeyValueStore>(
    state: &mut AppState<S>,
    cfg: &Config,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    info!("command dashboard");

    let settings = QuoteSettings::from_config(cfg)?;
    let pending = if settings.enabled {
        let runtime = background_runtime()?;
        let rx = start_quote_fetch(&runtime, GeminiClient::new(&settings), settings.timeout);
        Some((runtime, rx))
    } else {
        debug!("quote fetch disabled");
        None
    };

    let stats = state.stats();
    renderer.print_header(&stats, Utc::now())?;
    println!();
    renderer.print_stats(&stats)?;
    println!();
    let active = state.view(Page::Home, CategoryFilter::All);
    renderer.print_task_table(&active)?;
    println!();
    renderer.print_targets(state.targets())?;
    println!();

    if let Some((runtime, mut rx)) = pending {
        let action = runtime.block_on(rx.recv()).unwrap_or_else(|| {
            warn!("quote fetch ended without a result; using fallback");
            Action::QuoteLoaded(quote::FALLBACK_QUOTE.to_string())
        });
        state.apply(action);
    }
    renderer.print_quote(state.quote())
}

#[instrument(skip(state, text))]
fn cmd_add<S: KeyValueStore>(
    state: &mut AppState<S>,
    text: &str,
    category: TaskCategory,
) -> anyhow::Result<()> {
    info!("command add");

    match state.add_task(text, category) {
        Some(id) => println!("Created task {}.", short_id(&id)),
        None => println!("Nothing to add: task text is empty."),
    }
    Ok(())
}

#[instrument(skip(state, text))]
fn cmd_edit<S: KeyValueStore>(
    state: &mut AppState<S>,
    prefix: &str,
    text: &str,
    category: Option<TaskCategory>,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some(id) = resolve_task(state, prefix)? else {
        return Ok(());
    };
    let category = match (category, state.task(&id)) {
        (Some(category), _) => category,
        (None, Some(task)) => task.category,
        (None, None) => return Ok(()),
    };

    if state.edit_task(&id, text, category) {
        println!("Modified task {}.", short_id(&id));
    } else {
        println!("Task {} unchanged: task text is empty.", short_id(&id));
    }
    Ok(())
}

#[instrument(skip(state))]
fn cmd_set_status<S: KeyValueStore>(
    state: &mut AppState<S>,
    prefix: &str,
    status: TaskStatus,
    confirmed: bool,
) -> anyhow::Result<()> {
    info!("command set status");

    let Some(id) = resolve_task(state, prefix)? else {
        return Ok(());
    };
    let Some(task) = state.task(&id) else {
        return Ok(());
    };

    if !confirmed && TaskStatus::requires_confirmation(task.status, status) {
        let question = format!("Mark '{}' as {status}?", task.text);
        if !confirm(&question)? {
            println!("Task {} left {}.", short_id(&id), task.status);
            return Ok(());
        }
    }

    state.set_task_status(&id, status);
    println!("Task {} is now {status}.", short_id(&id));
    Ok(())
}

#[instrument(skip(state))]
fn cmd_delete<S: KeyValueStore>(state: &mut AppState<S>, prefix: &str) -> anyhow::Result<()> {
    info!("command delete");

    let Some(id) = resolve_task(state, prefix)? else {
        return Ok(());
    };
    state.remove_task(&id);
    println!("Deleted task {}.", short_id(&id));
    Ok(())
}

#[instrument(skip(state, renderer))]
fn cmd_list<S: KeyValueStore>(
    state: &AppState<S>,
    renderer: &mut Renderer,
    page: Page,
    category: CategoryFilter,
) -> anyhow::Result<()> {
    info!("command list");

    let tasks = state.view(page, category);
    renderer.print_task_table(&tasks)
}

fn cmd_stats<S: KeyValueStore>(state: &AppState<S>, renderer: &mut Renderer) -> anyhow::Result<()> {
    renderer.print_stats(&state.stats())
}

#[instrument(skip(state, renderer, sub))]
fn cmd_target<S: KeyValueStore>(
    state: &mut AppState<S>,
    renderer: &mut Renderer,
    sub: TargetCommand,
) -> anyhow::Result<()> {
    info!("command target");

    match sub {
        TargetCommand::Add { text } => match state.add_target(&joined(&text)) {
            Some(id) => println!("Created target {}.", short_id(&id)),
            None => println!("Nothing to add: target text is empty."),
        },
        TargetCommand::Toggle { id } => {
            let Some(id) = resolve_target(state, &id)? else {
                return Ok(());
            };
            state.toggle_target(&id);
            let done = state.targets().get(&id).is_some_and(|t| t.completed);
            let mark = if done { "checked" } else { "unchecked" };
            println!("Target {} {mark}.", short_id(&id));
        }
        TargetCommand::Delete { id } => {
            let Some(id) = resolve_target(state, &id)? else {
                return Ok(());
            };
            state.remove_target(&id);
            println!("Deleted target {}.", short_id(&id));
        }
        TargetCommand::List => renderer.print_targets(state.targets())?,
    }
    Ok(())
}

#[instrument(skip(state, sub))]
fn cmd_log<S: KeyValueStore>(state: &mut AppState<S>, sub: LogCommand) -> anyhow::Result<()> {
    info!("command log");

    let (kind, logged) = match sub {
        LogCommand::Movie { title } => (LeisureKind::Movie, state.log_movie(&joined(&title))),
        LogCommand::Game { title, hours } => (LeisureKind::Game, state.log_game(&title, &hours)),
        LogCommand::Show { title, hours } => (LeisureKind::Show, state.log_show(&title, &hours)),
    };

    let entry = logged.and_then(|id| {
        state
            .leisure()
            .entries(kind)
            .iter()
            .find(|entry| entry.id == id)
    });
    match entry {
        Some(entry) => println!("Logged {}: {}", kind.label(), describe_entry(entry)),
        None => println!("Nothing logged: a title and a non-negative number of hours are required."),
    }
    Ok(())
}

#[instrument(skip(state, renderer, args))]
fn cmd_theme<S: KeyValueStore>(
    state: &mut AppState<S>,
    renderer: &mut Renderer,
    args: ThemeArgs,
) -> anyhow::Result<()> {
    info!("command theme");

    let theme = if args.cycle {
        state.cycle_theme()
    } else if let Some(theme) = args.theme {
        state.apply(Action::SetTheme(theme));
        theme
    } else {
        state.preferences().theme
    };
    renderer.set_preferences(state.preferences());
    println!("Theme: {theme} ({})", theme.title());
    Ok(())
}

#[instrument(skip(state, renderer))]
fn cmd_mode<S: KeyValueStore>(
    state: &mut AppState<S>,
    renderer: &mut Renderer,
    value: Option<&str>,
) -> anyhow::Result<()> {
    info!("command mode");

    let mode = match value.map(ModeChange::parse).transpose()? {
        Some(ModeChange::Toggle) => state.toggle_color_mode(),
        Some(ModeChange::Set(mode)) => {
            state.set_color_mode(mode);
            mode
        }
        None => state.preferences().color_mode,
    };
    renderer.set_preferences(state.preferences());
    println!("Color mode: {mode}");
    Ok(())
}

#[instrument(skip(cfg))]
fn cmd_quote(cfg: &Config) -> anyhow::Result<()> {
    info!("command quote");

    let settings = QuoteSettings::from_config(cfg)?;
    if !settings.enabled {
        println!("{}", quote::FALLBACK_QUOTE);
        return Ok(());
    }
    let client = GeminiClient::new(&settings)?;
    let line = run_async(quote::motivational_line_or_fallback(&client, settings.timeout))?;
    println!("{line}");
    Ok(())
}

#[instrument(skip(cfg))]
fn cmd_suggest(cfg: &Config, goal: &str) -> anyhow::Result<()> {
    info!("command suggest");

    let settings = QuoteSettings::from_config(cfg)?;
    let suggestions = if settings.enabled {
        let client = GeminiClient::new(&settings)?;
        run_async(quote::suggest_tasks_or_empty(&client, goal, settings.timeout))?
    } else {
        Vec::new()
    };

    if suggestions.is_empty() {
        println!("No suggestions available.");
        return Ok(());
    }
    for (idx, line) in suggestions.iter().enumerate() {
        println!("{}. {line}", idx + 1);
    }
    Ok(())
}

#[instrument(skip(state))]
fn cmd_export<S: KeyValueStore>(state: &AppState<S>) -> anyhow::Result<()> {
    info!("command export");

    let out = serde_json::to_string_pretty(&state.export()?)?;
    println!("{out}");
    Ok(())
}

#[instrument(skip(state))]
fn cmd_import<S: KeyValueStore>(state: &mut AppState<S>, file: Option<&Path>) -> anyhow::Result<()> {
    info!("command import");

    let text = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut stdin = String::new();
            io::stdin()
                .read_to_string(&mut stdin)
                .context("failed reading stdin")?;
            stdin
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("import input is empty"));
    }
    let dump: Value = serde_json::from_str(trimmed).context("import input is not valid JSON")?;
    let slots = state.import(&dump)?;

    let names: Vec<&str> = slots.iter().map(|slot| slot.key()).collect();
    println!("Imported {} slot(s): {}", names.len(), names.join(", "));
    Ok(())
}

fn resolve_task<S: KeyValueStore>(state: &AppState<S>, prefix: &str) -> anyhow::Result<Option<String>> {
    let resolved = state.resolve_task(prefix)?;
    if resolved.is_none() {
        println!("No task matches '{prefix}'.");
    }
    Ok(resolved)
}

fn resolve_target<S: KeyValueStore>(state: &AppState<S>, prefix: &str) -> anyhow::Result<Option<String>> {
    let resolved = state.targets().resolve_prefix(prefix)?;
    if resolved.is_none() {
        println!("No target matches '{prefix}'.");
    }
    Ok(resolved)
}

/// Reads one answer from stdin. Anything but `y`/`yes` declines, as does EOF.
fn confirm(question: &str) -> anyhow::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    drop(out);

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed reading confirmation")?;
    Ok(parse_confirmation(&answer))
}

fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
