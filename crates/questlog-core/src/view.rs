use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;

use crate::task::{Task, TaskCategory, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    Completed,
    Incomplete,
    Leisure,
}

impl Page {
    /// Status shown on this page; `None` means the page does not filter.
    pub fn status(self) -> Option<TaskStatus> {
        match self {
            Page::Home => Some(TaskStatus::Active),
            Page::Completed => Some(TaskStatus::Completed),
            Page::Incomplete => Some(TaskStatus::Incomplete),
            Page::Leisure => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Completed => "completed",
            Page::Incomplete => "incomplete",
            Page::Leisure => "leisure",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "active" => Ok(Page::Home),
            "completed" | "done" => Ok(Page::Completed),
            "incomplete" => Ok(Page::Incomplete),
            "leisure" | "all" => Ok(Page::Leisure),
            other => Err(anyhow!("unknown page: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(TaskCategory),
}

impl CategoryFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => task.category == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

pub fn filter_by_page(tasks: &[Task], page: Page) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| page.status().is_none_or(|status| t.status == status))
        .collect()
}

pub fn filter_by_category<'a>(tasks: &[&'a Task], category: CategoryFilter) -> Vec<&'a Task> {
    tasks.iter().copied().filter(|t| category.matches(t)).collect()
}

/// Page filter first, then category, preserving order.
pub fn filter_tasks(tasks: &[Task], page: Page, category: CategoryFilter) -> Vec<&Task> {
    filter_by_category(&filter_by_page(tasks, page), category)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub percentage: u32,
}

impl Stats {
    pub fn compute(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let remaining = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Active)
            .count();

        Self {
            total,
            completed,
            remaining,
            percentage: rounded_percentage(completed, total),
        }
    }
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
fn rounded_percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = (200 * part as u64 + whole as u64) / (2 * whole as u64);
    scaled as u32
}
