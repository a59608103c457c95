use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cardfetch::{FetchJob, FetchQueue, HttpImageFetcher, ImageFetcher, SyntheticFetcher};
use menuconfig::MenuConfig;
use reveal::{
    FixedTimeSource, FrameControl, FrameDriver, HeadlessFrameDriver, SystemTimeSource,
    TimeSource,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::bindings;
use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::session::MenuSession;

/// Elapsed time used for still exports when `--time` is not given.
const DEFAULT_STILL_TIME: Duration = Duration::from_secs(1);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration an invocation should use.
///
/// An explicit path must exist; the discovered file is optional and falls back
/// to built-in defaults.
pub fn load_config(paths: &AppPaths, explicit: Option<&Path>) -> Result<MenuConfig> {
    let path = paths.resolve_config(explicit);
    let config = if explicit.is_some() {
        MenuConfig::load(&path)
    } else {
        MenuConfig::load_or_default(&path)
    }
    .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn apply_overrides(config: &mut MenuConfig, args: &RunArgs) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        config.fetch.concurrency = concurrency;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.fetch.timeout = Duration::from_millis(timeout_ms);
    }
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(())
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let mut config = load_config(&paths, args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let settings = bindings::menu_settings(&config);
    let source = bindings::card_source(&config.fetch)?;
    let fetcher: Arc<dyn ImageFetcher> = if args.offline {
        info!("remote fetch disabled (--offline); using generated tiles");
        Arc::new(SyntheticFetcher::default())
    } else {
        Arc::new(
            HttpImageFetcher::new(config.fetch.timeout)
                .context("failed to build HTTP client")?,
        )
    };
    let jobs = FetchJob::for_grid(&source, settings.layout.card_count());
    let settle_within = settle_bound(jobs.len(), config.fetch.concurrency, config.fetch.timeout);
    let queue = FetchQueue::spawn(fetcher, jobs, config.fetch.concurrency)
        .context("failed to start card fetches")?;

    info!(
        rows = settings.layout.rows,
        cols = settings.layout.cols,
        host = %source.host(),
        "starting card menu"
    );
    let mut session = MenuSession::new(settings, Some(queue));

    match &args.export {
        Some(path) => export_still(&mut session, &args, path, settle_within),
        None => animate(&mut session, &args),
    }
}

fn animate(session: &mut MenuSession, args: &RunArgs) -> Result<()> {
    let fps = (args.fps > 0.0).then_some(args.fps);
    let mut driver = HeadlessFrameDriver::new(Box::new(SystemTimeSource::new()))
        .with_frame_limit(args.frames)
        .with_target_fps(fps);

    let mut last_count = 0;
    let frames = driver.run(&mut |sample| {
        let phase = session.tick(sample);
        let count = session.menu().cards().count();
        if count != last_count {
            debug!(
                frame = sample.frame_index,
                cards = count,
                time = phase.raw(),
                "grid updated"
            );
            last_count = count;
        }
        FrameControl::Continue
    })?;

    info!(
        frames,
        cards = session.menu().cards().count(),
        failed = session.failed(),
        pending = session.pending(),
        "animation finished"
    );
    Ok(())
}

/// Longest a still export waits on fetches: one timeout per wave of workers.
fn settle_bound(jobs: usize, concurrency: usize, timeout: Duration) -> Duration {
    let waves = jobs.div_ceil(concurrency.max(1)).max(1);
    timeout.saturating_mul(u32::try_from(waves).unwrap_or(u32::MAX))
}

fn export_still(
    session: &mut MenuSession,
    args: &RunArgs,
    path: &Path,
    settle_within: Duration,
) -> Result<()> {
    session.settle(settle_within);

    let elapsed = args.time.unwrap_or(DEFAULT_STILL_TIME);
    let mut clock = FixedTimeSource::new(elapsed);
    let phase = session.tick(&clock.sample());
    info!(
        elapsed = ?elapsed,
        time = phase.raw(),
        eased = phase.eased(),
        cards = session.menu().cards().count(),
        "rendering still"
    );

    let written = reveal::gpu::render_still(session.scene(), session.menu().root(), args.size, path)?;
    println!("{}", written.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::TempDir;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn explicit_config_must_exist() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        assert!(load_config(&paths, None).is_ok());
        assert!(load_config(&paths, Some(&root.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn discovered_config_is_used() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join("cardmenu.toml"),
            "version = 1\n[grid]\nrows = 2\ncols = 3\n",
        )
        .unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let config = load_config(&paths, None).unwrap();
        assert_eq!(config.grid.card_count(), 6);
    }

    #[test]
    fn overrides_are_validated() {
        let cli = Cli::try_parse_from(["cardmenu", "--concurrency", "2", "--timeout-ms", "250"])
            .unwrap();
        let mut config = MenuConfig::default();
        apply_overrides(&mut config, &cli.run).unwrap();
        assert_eq!(config.fetch.concurrency, 2);
        assert_eq!(config.fetch.timeout, Duration::from_millis(250));

        let cli = Cli::try_parse_from(["cardmenu", "--concurrency", "0"]).unwrap();
        assert!(apply_overrides(&mut MenuConfig::default(), &cli.run).is_err());
    }

    #[test]
    fn settle_bound_covers_every_wave() {
        let timeout = Duration::from_secs(10);
        // 24 cards plus a card back on 6 workers take five sequential waves.
        assert_eq!(settle_bound(25, 6, timeout), Duration::from_secs(50));
        assert_eq!(settle_bound(24, 6, timeout), Duration::from_secs(40));
        assert_eq!(settle_bound(3, 8, timeout), timeout);
        assert_eq!(settle_bound(0, 4, timeout), timeout);
    }
}
