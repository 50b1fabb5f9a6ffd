//! Live watch: one subscription and delivery thread per pairing.
use std::sync::Arc;
use std::thread::JoinHandle;

use super::handler::PairingHandler;
use super::signal::StopSignal;
use super::source::{SubscriptionId, WatchSource};
use crate::error::WatchError;
use crate::tasks::Context;

struct Worker {
    name: String,
    handle: JoinHandle<usize>,
}

/// Running watch threads for every pairing whose subscription succeeded.
pub struct LiveWatch {
    workers: Vec<Worker>,
    failures: Vec<(String, WatchError)>,
    stop: StopSignal,
}

impl std::fmt::Debug for LiveWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveWatch")
            .field(
                "workers",
                &self.workers.iter().map(|w| w.name.as_str()).collect::<Vec<_>>(),
            )
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl LiveWatch {
    /// Subscribe every pairing of `ctx` on `source` and start its thread.
    ///
    /// Pairings whose watch, destination or sync directory is invalid were
    /// already reported by the initial sync and are not watched. A subscription that
    /// fails is logged and kept in [`Self::failures`]; the remaining pairings
    /// are still watched.
    #[must_use]
    pub fn start(ctx: &Context, source: &Arc<dyn WatchSource>, stop: &StopSignal) -> Self {
        let mut workers = Vec::new();
        let mut failures = Vec::new();

        for pairing in ctx.pairings() {
            let name = pairing.name();
            if !pairing.watch.is_dir()
                || !pairing.destination.is_dir()
                || !pairing.has_valid_target()
            {
                ctx.log.debug(&format!("not watching {name}: invalid path"));
                continue;
            }

            let subscription = match source.subscribe(&pairing.watch, true) {
                Ok(subscription) => subscription,
                Err(e) => {
                    ctx.log.error(&format!("cannot watch {name}: {e}"));
                    failures.push((name, e));
                    continue;
                }
            };

            let id = subscription.id;
            let watch = pairing.watch.clone();
            let mut handler = PairingHandler::new(pairing, ctx.log.clone(), ctx.promoter.clone());
            let thread_source = Arc::clone(source);
            let thread_log = ctx.log.clone();
            let thread_stop = stop.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("watch {name}"))
                .spawn(move || {
                    let handled = handler.run(&subscription.events, &thread_stop);
                    if let Err(e) = thread_source.unsubscribe(subscription.id) {
                        thread_log.warn(&format!("{}: {e}", handler.pairing().name()));
                    }
                    handled
                });

            match spawned {
                Ok(handle) => {
                    ctx.log.debug(&format!("watching {name}"));
                    workers.push(Worker { name, handle });
                }
                Err(source_err) => {
                    release(source.as_ref(), id, ctx);
                    let e = WatchError::Thread {
                        path: watch,
                        source: source_err,
                    };
                    ctx.log.error(&format!("cannot watch {name}: {e}"));
                    failures.push((name, e));
                }
            }
        }

        Self {
            workers,
            failures,
            stop: stop.clone(),
        }
    }

    /// Number of pairings being watched.
    #[must_use]
    pub fn watching(&self) -> usize {
        self.workers.len()
    }

    /// Pairings whose watch could not be started.
    #[must_use]
    pub fn failures(&self) -> &[(String, WatchError)] {
        &self.failures
    }

    /// Raise the stop signal.
    pub fn stop(&self) {
        self.stop.raise();
    }

    /// Wait for every watch thread to finish and return the number of
    /// pairings stopped.
    ///
    /// Threads finish when the stop signal is raised or their stream
    /// disconnects.
    pub fn join(self, ctx: &Context) -> usize {
        let mut stopped = 0;
        for worker in self.workers {
            match worker.handle.join() {
                Ok(handled) => {
                    ctx.log
                        .debug(&format!("{}: {handled} event(s) handled", worker.name));
                    stopped += 1;
                }
                Err(_) => ctx
                    .log
                    .error(&format!("{}: watch thread panicked", worker.name)),
            }
        }
        stopped
    }
}

fn release(source: &dyn WatchSource, id: SubscriptionId, ctx: &Context) {
    if let Err(e) = source.unsubscribe(id) {
        ctx.log.warn(&e.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::config::test_helpers::single_rule;
    use crate::logging::{Level, MemoryLog};
    use crate::tasks::test_helpers::make_context;
    use crate::watch::source::{ChannelWatchSource, FileEvent, FileEventKind};
    use std::path::Path;

    fn repo(root: &Path) {
        std::fs::create_dir_all(root.join("shared")).unwrap();
        std::fs::create_dir_all(root.join("module_a")).unwrap();
        std::fs::create_dir_all(root.join("module_b")).unwrap();
    }

    fn start(
        root: &Path,
        config: Configuration,
    ) -> (Context, Arc<MemoryLog>, Arc<ChannelWatchSource>, LiveWatch) {
        let (ctx, log) = make_context(root, config);
        let channel = Arc::new(ChannelWatchSource::new());
        let source: Arc<dyn WatchSource> = channel.clone();
        let live = LiveWatch::start(&ctx, &source, &StopSignal::new());
        (ctx, log, channel, live)
    }

    #[test]
    fn each_destination_gets_its_own_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        repo(root);
        let config = Configuration::parse(
            r#"{"sync": [{"watch": "shared", "destinations": [
                {"path": "module_a"}, {"path": "module_b"}
            ]}]}"#,
            Path::new("molerat.json"),
        )
        .unwrap();

        let (ctx, _, channel, live) = start(root, config);
        assert_eq!(live.watching(), 2);
        assert_eq!(channel.subscriptions(), 2);

        std::fs::write(root.join("shared/a.py"), "x = 1\n").unwrap();
        channel.send(&FileEvent::new(FileEventKind::Created, root.join("shared/a.py")));
        channel.close();

        assert_eq!(live.join(&ctx), 2);
        assert!(root.join("module_a/shared/a.py").exists());
        assert!(root.join("module_b/shared/a.py").exists());
    }

    #[test]
    fn invalid_pairings_are_not_watched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        repo(root);
        let (ctx, _, channel, live) = start(root, single_rule("missing", &[], "module_a", None));
        assert_eq!(live.watching(), 0);
        assert_eq!(channel.subscriptions(), 0);
        assert_eq!(live.join(&ctx), 0);
    }

    #[test]
    fn pairing_with_escaping_directory_is_not_watched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        repo(root);
        let (ctx, _, channel, live) = start(root, single_rule("shared", &[], "module_a", Some("..")));
        assert_eq!(live.watching(), 0);
        assert_eq!(channel.subscriptions(), 0);
        assert_eq!(live.join(&ctx), 0);
    }

    #[test]
    fn refused_subscription_is_a_failure_others_still_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        repo(root);
        std::fs::create_dir_all(root.join("other")).unwrap();
        let config = Configuration::parse(
            r#"{"sync": [
                {"watch": "shared", "destinations": [{"path": "module_a"}]},
                {"watch": "other", "destinations": [{"path": "module_b"}]}
            ]}"#,
            Path::new("molerat.json"),
        )
        .unwrap();
        let (ctx, log) = make_context(root, config);
        let channel = Arc::new(ChannelWatchSource::new());
        channel.refuse(&root.join("shared"));
        let source: Arc<dyn WatchSource> = channel.clone();

        let live = LiveWatch::start(&ctx, &source, &StopSignal::new());

        assert_eq!(live.watching(), 1);
        assert_eq!(live.failures().len(), 1);
        assert!(live.failures()[0].0.starts_with("shared"));
        assert!(log.contains(Level::Error, "cannot watch shared"));
        channel.close();
        assert_eq!(live.join(&ctx), 1);
    }

    #[test]
    fn stop_ends_every_thread_and_unsubscribes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        repo(root);
        let (ctx, _, channel, live) = start(root, single_rule("shared", &[], "module_a", None));
        assert_eq!(channel.subscriptions(), 1);

        live.stop();
        assert_eq!(live.join(&ctx), 1);
        assert_eq!(channel.subscriptions(), 0);
    }

    #[test]
    fn backend_errors_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        repo(root);
        let (ctx, log, channel, live) = start(root, single_rule("shared", &[], "module_a", None));

        channel.send_error(&root.join("shared"), "queue overflow");
        std::fs::write(root.join("shared/b.py"), "").unwrap();
        channel.send(&FileEvent::new(FileEventKind::Created, root.join("shared/b.py")));
        channel.close();

        assert_eq!(live.join(&ctx), 1);
        assert!(log.contains(Level::Warn, "queue overflow"));
        assert!(root.join("module_a/shared/b.py").exists());
    }
}
