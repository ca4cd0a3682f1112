pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod datastore;
pub mod datetime;
pub mod intent;
pub mod render;
pub mod task;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting trellis"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.trellisrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
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

  let calendar =
    calendar::CalendarConfig::load(
      &config::calendar_config_path(
        &cfg, &data_dir
      )
    );
  let tz = datetime::resolve_timezone(
    calendar.timezone.as_deref()
  );
  let today = datetime::today_in(tz);
  debug!(tz = tz.name(), %today, "resolved calendar clock");

  let store =
    datastore::DataStore::open(
      &data_dir,
      &cfg.workspace()
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let ctx = commands::CommandContext {
    store: &store,
    renderer: &renderer,
    calendar: &calendar,
    today,
    now: Utc::now()
  };

  let mut out = io::stdout().lock();
  commands::dispatch(
    &ctx,
    cli.command,
    &mut out
  )?;

  info!("done");
  Ok(())
}
