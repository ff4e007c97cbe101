use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::quote::{
  DEFAULT_API_KEY_ENV,
  DEFAULT_ENDPOINT,
  DEFAULT_MODEL
};

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("data.location", "~/.questlog"),
      ("color", "on"),
      ("quote.enabled", "on"),
      ("quote.model", DEFAULT_MODEL),
      (
        "quote.endpoint",
        DEFAULT_ENDPOINT
      ),
      (
        "quote.api_key_env",
        DEFAULT_API_KEY_ENV
      ),
      ("quote.timeout", "10")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading questlogrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no questlogrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      debug!(key = %k, value = %v, "applying override");
      self.map.insert(k, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());
    self.parse_text(&path, &text)
  }

  fn parse_text(
    &mut self,
    path: &Path,
    text: &str
  ) -> anyhow::Result<()> {
    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      if !self.map.contains_key(&key) {
        warn!(key = %key, file = %path.display(), "unrecognized config key");
      }
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("QUESTLOGRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       questlogrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".questlogrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".questlog"))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_cover_every_key() {
    let cfg = Config::default();
    assert_eq!(
      cfg.get("quote.model").as_deref(),
      Some(DEFAULT_MODEL)
    );
    assert_eq!(
      cfg.get_bool("quote.enabled"),
      Some(true)
    );
    assert_eq!(
      cfg.get("quote.timeout").as_deref(),
      Some("10")
    );
  }

  #[test]
  fn file_values_and_overrides_layer() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc = dir.path().join("rc");
    fs::write(
      &rc,
      "# comment\n\
       color = off\n\
       quote.model = other # trailing\n\
       \n"
    )
    .expect("write rc");

    let mut cfg =
      Config::load(Some(&rc))
        .expect("load");
    assert_eq!(
      cfg.get_bool("color"),
      Some(false)
    );
    assert_eq!(
      cfg.get("quote.model").as_deref(),
      Some("other")
    );
    assert_eq!(cfg.loaded_files, vec![
      rc.clone()
    ]);

    cfg.apply_overrides([(
      "quote.enabled".to_string(),
      "no".to_string()
    )]);
    assert_eq!(
      cfg.get_bool("quote.enabled"),
      Some(false)
    );
  }

  #[test]
  fn malformed_line_is_rejected() {
    let mut cfg = Config::default();
    let err = cfg
      .parse_text(
        Path::new("rc"),
        "color on\n"
      )
      .expect_err("should fail");
    assert!(
      err
        .to_string()
        .contains("rc:1")
    );
  }

  #[test]
  fn explicit_data_dir_is_created() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let target =
      dir.path().join("nested/data");
    let resolved = resolve_data_dir(
      &Config::default(),
      Some(&target)
    )
    .expect("resolve");
    assert_eq!(resolved, target);
    assert!(target.is_dir());
  }
}
