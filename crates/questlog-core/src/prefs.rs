use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Vaporwave,
    Cyberpunk,
    Fantasy,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Vaporwave, Theme::Cyberpunk, Theme::Fantasy];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Vaporwave => "VAPORWAVE",
            Theme::Cyberpunk => "CYBERPUNK",
            Theme::Fantasy => "FANTASY",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Theme::Vaporwave => Theme::Cyberpunk,
            Theme::Cyberpunk => Theme::Fantasy,
            Theme::Fantasy => Theme::Vaporwave,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Theme::Vaporwave => "Daily Tasks",
            Theme::Cyberpunk => "Neuro-Grid HUD",
            Theme::Fantasy => "Quest Log",
        }
    }

    /// ANSI color used for headings.
    pub fn accent(self) -> u8 {
        match self {
            Theme::Vaporwave => 35,
            Theme::Cyberpunk => 33,
            Theme::Fantasy => 32,
        }
    }

    pub fn mascot(self, completion_percentage: u32) -> &'static str {
        match self {
            Theme::Fantasy => "🧙",
            Theme::Cyberpunk => "🤖",
            Theme::Vaporwave if completion_percentage >= 90 => "👑",
            Theme::Vaporwave if completion_percentage >= 50 => "🔥",
            Theme::Vaporwave => "⚡",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown theme: {s} (expected vaporwave, cyberpunk or fantasy)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Dark,
    #[default]
    Light,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Dark => "dark",
            ColorMode::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ColorMode::Dark => ColorMode::Light,
            ColorMode::Light => ColorMode::Dark,
        }
    }

    /// Anything but `"dark"` reads as light.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            Some("dark") => ColorMode::Dark,
            _ => ColorMode::Light,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(ColorMode::Dark),
            "light" => Ok(ColorMode::Light),
            other => Err(anyhow!("unknown color mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub theme: Theme,
    pub color_mode: ColorMode,
}

impl Preferences {
    pub fn from_stored(theme: Option<&str>, color_mode: Option<&str>) -> Self {
        Self {
            theme: theme.and_then(|raw| raw.parse().ok()).unwrap_or_default(),
            color_mode: ColorMode::from_stored(color_mode),
        }
    }
}
