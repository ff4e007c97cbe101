use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::leisure::{LeisureEntry, LeisureKind, LeisureLog};
use crate::prefs::{ColorMode, Preferences};
use crate::targets::TargetList;
use crate::task::{Task, TaskStatus};
use crate::view::Stats;

/// Shortest id prefix shown in tables.
pub const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    prefs: Preferences,
}

impl Renderer {
    pub fn new(cfg: &Config, prefs: Preferences) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color, prefs })
    }

    pub fn set_preferences(&mut self, prefs: Preferences) {
        self.prefs = prefs;
    }

    #[tracing::instrument(skip(self, stats, now))]
    pub fn print_header(&mut self, stats: &Stats, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let theme = self.prefs.theme;
        let title = self.accent(theme.title());
        writeln!(out, "{} {}", theme.mascot(stats.percentage), title)?;
        writeln!(
            out,
            "ENV::{} // DATE::{}",
            theme,
            now.with_timezone(&Local).format("%Y-%m-%d")
        )?;
        Ok(())
    }

    pub fn print_quote(&mut self, quote: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "\"{}\"", self.paint(quote, 36))?;
        Ok(())
    }

    pub fn print_stats(&mut self, stats: &Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Progress: {}% ({}/{})  active={}",
            stats.percentage, stats.completed, stats.total, stats.remaining
        )?;
        writeln!(out, "{}", progress_bar(stats.percentage, 20))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[&Task]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Category".to_string(),
            "Created".to_string(),
            "Task".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(short_id(&task.id), 33),
                    self.paint(task.status.as_str(), status_color(task.status)),
                    task.category.to_string(),
                    task.created_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d")
                        .to_string(),
                    task.text.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_targets(&mut self, targets: &TargetList) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "{} ({}/{})",
            self.accent("Weekly targets"),
            targets.completed_count(),
            targets.len()
        )?;
        if targets.is_empty() {
            writeln!(out, "  none")?;
        }
        for target in targets.as_slice() {
            let mark = if target.completed { "[x]" } else { "[ ]" };
            writeln!(out, "  {mark} {} {}", self.paint(short_id(&target.id), 33), target.text)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, log))]
    pub fn print_leisure(&mut self, log: &LeisureLog, only: Option<LeisureKind>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let kinds: Vec<LeisureKind> = match only {
            Some(kind) => vec![kind],
            None => LeisureKind::ALL.to_vec(),
        };

        for kind in kinds {
            let entries = log.entries(kind);
            match kind {
                LeisureKind::Movie => writeln!(out, "{} ({})", self.accent("Movies"), entries.len())?,
                _ => writeln!(
                    out,
                    "{} ({}, {}h)",
                    self.accent(heading(kind)),
                    entries.len(),
                    format_hours(log.hours_logged(kind))
                )?,
            }
            if entries.is_empty() {
                writeln!(out, "  nothing logged")?;
            }
            for entry in entries {
                writeln!(out, "  {}", describe_entry(entry))?;
            }
        }
        Ok(())
    }

    fn accent(&self, text: &str) -> String {
        self.paint(text, self.prefs.theme.accent())
    }

    /// Bright palette in dark mode, normal palette in light mode.
    fn paint(&self, text: &str, code: u8) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        let code = match self.prefs.color_mode {
            ColorMode::Dark if (30..=37).contains(&code) => code + 60,
            _ => code,
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn heading(kind: LeisureKind) -> &'static str {
    match kind {
        LeisureKind::Movie => "Movies",
        LeisureKind::Game => "Games",
        LeisureKind::Show => "Shows",
    }
}

fn status_color(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Active => 34,
        TaskStatus::Completed => 32,
        TaskStatus::Incomplete => 31,
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

pub fn describe_entry(entry: &LeisureEntry) -> String {
    match entry.activity.hours() {
        Some(hours) => format!("{}  {}h", entry.activity.title(), format_hours(hours)),
        None => format!("{}  watched", entry.activity.title()),
    }
}

/// `2.5` stays `2.5`, `3.0` prints as `3`. Negative zero prints as `0`.
pub fn format_hours(hours: f64) -> String {
    let hours = hours + 0.0;
    let text = format!("{hours:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn progress_bar(percentage: u32, width: usize) -> String {
    let filled = (percentage.min(100) as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
