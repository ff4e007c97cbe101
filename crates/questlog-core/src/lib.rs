pub mod cli;
pub mod commands;
pub mod config;
pub mod leisure;
pub mod prefs;
pub mod quote;
pub mod render;
pub mod state;
pub mod storage;
pub mod targets;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting questlog"
  );
  debug!(overrides = ?cli.overrides, "command line overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    storage::FileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open data \
         directory {}",
        data_dir.display()
      )
    })?;

  let mut state =
    state::AppState::load(store);
  let mut renderer =
    render::Renderer::new(
      &cfg,
      state.preferences()
    )?;

  commands::dispatch(
    &mut state,
    &cfg,
    &mut renderer,
    cli
      .command
      .unwrap_or(cli::Command::Dashboard)
  )?;

  info!("done");
  Ok(())
}
