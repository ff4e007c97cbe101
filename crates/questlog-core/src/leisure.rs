use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::Slot;
use crate::task::{new_id, non_empty};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeisureKind {
    Movie,
    Game,
    Show,
}

impl LeisureKind {
    pub const ALL: [LeisureKind; 3] = [LeisureKind::Movie, LeisureKind::Game, LeisureKind::Show];

    pub fn slot(self) -> Slot {
        match self {
            LeisureKind::Movie => Slot::Movies,
            LeisureKind::Game => Slot::Games,
            LeisureKind::Show => Slot::Shows,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeisureKind::Movie => "movies",
            LeisureKind::Game => "games",
            LeisureKind::Show => "shows",
        }
    }
}

impl fmt::Display for LeisureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeisureKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(LeisureKind::Movie),
            "game" | "games" => Ok(LeisureKind::Game),
            "show" | "shows" | "tv" => Ok(LeisureKind::Show),
            other => Err(anyhow!("unknown leisure log: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Movie { title: String },
    Timed { title: String, hours: f64 },
}

impl Activity {
    pub fn title(&self) -> &str {
        match self {
            Activity::Movie { title } | Activity::Timed { title, .. } => title,
        }
    }

    pub fn hours(&self) -> Option<f64> {
        match self {
            Activity::Movie { .. } => None,
            Activity::Timed { hours, .. } => Some(*hours),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredActivity", into = "StoredActivity")]
pub struct LeisureEntry {
    pub id: String,
    pub activity: Activity,
}

/// Wire shape: `metric` is present only for timed entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredActivity {
    id: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metric: Option<f64>,
}

impl From<StoredActivity> for LeisureEntry {
    fn from(stored: StoredActivity) -> Self {
        let activity = match stored.metric {
            Some(hours) => Activity::Timed {
                title: stored.title,
                hours,
            },
            None => Activity::Movie {
                title: stored.title,
            },
        };
        Self {
            id: stored.id,
            activity,
        }
    }
}

impl From<LeisureEntry> for StoredActivity {
    fn from(entry: LeisureEntry) -> Self {
        let metric = entry.activity.hours();
        let title = match entry.activity {
            Activity::Movie { title } | Activity::Timed { title, .. } => title,
        };
        Self {
            id: entry.id,
            title,
            metric,
        }
    }
}

/// Parses a user-entered duration. Anything that is not a finite,
/// non-negative number is rejected.
pub fn parse_hours(raw: &str) -> Option<f64> {
    let hours: f64 = raw.trim().parse().ok()?;
    (hours.is_finite() && hours >= 0.0).then_some(hours)
}

/// The log an entry sits in decides its variant, not the presence of
/// `metric`. Movies drop any stray metric. Game and show records without a
/// usable metric (older builds stored `NaN` hours, which JSON writes as
/// `null`) are skipped with a warning.
pub fn conform_entries(kind: LeisureKind, entries: Vec<LeisureEntry>) -> Vec<LeisureEntry> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let LeisureEntry { id, activity } = entry;
            let activity = match (kind, activity) {
                (LeisureKind::Movie, Activity::Timed { title, .. }) => Activity::Movie { title },
                (LeisureKind::Movie, movie @ Activity::Movie { .. }) => movie,
                (_, Activity::Timed { title, hours }) if hours.is_finite() && hours >= 0.0 => {
                    Activity::Timed { title, hours }
                }
                (_, activity) => {
                    warn!(log = %kind, id = %id, title = activity.title(), "dropping entry without usable hours");
                    return None;
                }
            };
            Some(LeisureEntry { id, activity })
        })
        .collect()
}

/// Three append-only logs. There is no edit or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeisureLog {
    movies: Vec<LeisureEntry>,
    games: Vec<LeisureEntry>,
    shows: Vec<LeisureEntry>,
}

impl LeisureLog {
    pub fn new(movies: Vec<LeisureEntry>, games: Vec<LeisureEntry>, shows: Vec<LeisureEntry>) -> Self {
        Self {
            movies: conform_entries(LeisureKind::Movie, movies),
            games: conform_entries(LeisureKind::Game, games),
            shows: conform_entries(LeisureKind::Show, shows),
        }
    }

    pub fn entries(&self, kind: LeisureKind) -> &[LeisureEntry] {
        match kind {
            LeisureKind::Movie => &self.movies,
            LeisureKind::Game => &self.games,
            LeisureKind::Show => &self.shows,
        }
    }

    pub(crate) fn set_entries(&mut self, kind: LeisureKind, entries: Vec<LeisureEntry>) {
        *self.entries_mut(kind) = conform_entries(kind, entries);
    }

    fn entries_mut(&mut self, kind: LeisureKind) -> &mut Vec<LeisureEntry> {
        match kind {
            LeisureKind::Movie => &mut self.movies,
            LeisureKind::Game => &mut self.games,
            LeisureKind::Show => &mut self.shows,
        }
    }

    /// Total hours for `kind`. Folds from `0.0` so an empty log is `+0`,
    /// not the `-0` an empty float `sum` produces.
    pub fn hours_logged(&self, kind: LeisureKind) -> f64 {
        self.entries(kind)
            .iter()
            .filter_map(|e| e.activity.hours())
            .fold(0.0, |acc, hours| acc + hours)
    }

    pub fn log_movie(&mut self, title: &str) -> Option<String> {
        let title = non_empty(title)?;
        Some(self.push(LeisureKind::Movie, Activity::Movie { title }))
    }

    pub fn log_game(&mut self, title: &str, hours: &str) -> Option<String> {
        self.log_timed(LeisureKind::Game, title, hours)
    }

    pub fn log_show(&mut self, title: &str, hours: &str) -> Option<String> {
        self.log_timed(LeisureKind::Show, title, hours)
    }

    fn log_timed(&mut self, kind: LeisureKind, title: &str, hours: &str) -> Option<String> {
        let title = non_empty(title)?;
        let hours = parse_hours(hours)?;
        Some(self.push(kind, Activity::Timed { title, hours }))
    }

    fn push(&mut self, kind: LeisureKind, activity: Activity) -> String {
        let id = new_id();
        self.entries_mut(kind).push(LeisureEntry {
            id: id.clone(),
            activity,
        });
        id
    }
}
