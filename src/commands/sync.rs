//! The `molerat` run: initial sync, then live watching.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{Cli, VERSION};
use crate::logging::{Log, Logger};
use crate::tasks::{self, Context};
use crate::watch::{LiveWatch, NotifySource, StopSignal, WatchSource};

/// Run molerat: initial sync of every pairing, then live watching until
/// Ctrl+C unless `--no-watch` was given.
///
/// # Errors
///
/// Returns an error if no usable configuration is found or the watch could
/// not be started for some pairing. Failed pairings are only reported.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("molerat {VERSION}"));

    let sink: Arc<dyn Log> = Arc::clone(log) as Arc<dyn Log>;
    let setup = CommandSetup::init(&cli.global, &cli.sync, sink.as_ref())?;
    let ctx = setup.into_context(&cli.python, sink);

    initial_sync(&ctx);
    log.print_summary();

    if cli.global.no_watch {
        return Ok(());
    }

    let stop = StopSignal::new();
    stop.raise_on_interrupt().context("failed to install Ctrl+C handler")?;
    let source: Arc<dyn WatchSource> = Arc::new(NotifySource::new());
    watch_until_stopped(&ctx, &source, &stop)
}

/// Run the initial sync task of every pairing, in configuration order.
pub fn initial_sync(ctx: &Context) {
    ctx.log.stage("Initial sync");
    for task in tasks::initial_sync_tasks(ctx) {
        tasks::execute(task.as_ref(), ctx);
    }
}

/// Watch every valid pairing until `stop` is raised or `source` closes.
///
/// # Errors
///
/// Returns an error if any pairing could not be subscribed. The other
/// pairings are still watched until stopped.
pub fn watch_until_stopped(
    ctx: &Context,
    source: &Arc<dyn WatchSource>,
    stop: &StopSignal,
) -> Result<()> {
    ctx.log.stage("Watching");
    let live = LiveWatch::start(ctx, source, stop);
    let failed = live.failures().len();

    if live.watching() > 0 {
        ctx.log.info(&format!(
            "watching {} pairing(s), press Ctrl+C to stop",
            live.watching()
        ));
    } else if failed == 0 {
        ctx.log.warn("nothing to watch");
    }

    let stopped = live.join(ctx);
    ctx.log.info(&format!("stopped {stopped} pairing(s)"));

    if failed > 0 {
        anyhow::bail!("{failed} pairing(s) could not be watched");
    }
    Ok(())
}
