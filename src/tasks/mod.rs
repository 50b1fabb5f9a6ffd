//! Named units of work run once per pairing, with per-pairing result
//! recording.
pub mod context;
pub mod initial_sync;

pub use context::Context;

use anyhow::Result;

use crate::logging::SyncStatus;

/// Outcome of a task that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// The task completed.
    Ok,
    /// The task was skipped; the reason is reported.
    Skipped(String),
}

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> String;

    /// Whether this task should run at all.
    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails part way through. Work already
    /// done is not rolled back.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// The initial sync tasks, one per pairing, in configuration order.
#[must_use]
pub fn initial_sync_tasks(ctx: &Context) -> Vec<Box<dyn Task>> {
    ctx.pairings()
        .into_iter()
        .map(|pairing| Box::new(initial_sync::SyncPairing::new(pairing)) as Box<dyn Task>)
        .collect()
}

/// Execute a task, recording the result in the logger.
///
/// A failing task is reported and recorded; it never stops the caller from
/// running the remaining tasks.
pub fn execute(task: &dyn Task, ctx: &Context) -> SyncStatus {
    let name = task.name();
    if !task.should_run(ctx) {
        ctx.log.debug(&format!("skipping: {name} (not applicable)"));
        return SyncStatus::Skipped;
    }

    ctx.log.stage(&name);

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_sync(&name, SyncStatus::Ok, None);
            SyncStatus::Ok
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.warn(&format!("skipped: {reason}"));
            ctx.log.record_sync(&name, SyncStatus::Skipped, Some(&reason));
            SyncStatus::Skipped
        }
        Err(e) => {
            ctx.log.error(&format!("{name}: {e:#}"));
            ctx.log
                .record_sync(&name, SyncStatus::Failed, Some(&format!("{e:#}")));
            SyncStatus::Failed
        }
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::test_helpers::single_rule;
    use crate::logging::Level;
    use test_helpers::make_context;

    struct Fixed(Result<TaskResult, &'static str>);

    impl Task for Fixed {
        fn name(&self) -> String {
            "fixed".to_string()
        }

        fn run(&self, _ctx: &Context) -> Result<TaskResult> {
            self.0.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    struct NeverRuns;

    impl Task for NeverRuns {
        fn name(&self) -> String {
            "never".to_string()
        }

        fn should_run(&self, _ctx: &Context) -> bool {
            false
        }

        fn run(&self, _ctx: &Context) -> Result<TaskResult> {
            anyhow::bail!("must not run")
        }
    }

    fn ctx() -> (tempfile::TempDir, Context, std::sync::Arc<crate::logging::MemoryLog>) {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, log) = make_context(dir.path(), single_rule("shared", &[], "module_a", None));
        (dir, ctx, log)
    }

    #[test]
    fn ok_task_is_recorded() {
        let (_dir, ctx, log) = ctx();
        assert_eq!(execute(&Fixed(Ok(TaskResult::Ok)), &ctx), SyncStatus::Ok);
        assert_eq!(log.entries()[0].status, SyncStatus::Ok);
        assert!(log.contains(Level::Stage, "fixed"));
    }

    #[test]
    fn skipped_task_records_reason() {
        let (_dir, ctx, log) = ctx();
        let status = execute(&Fixed(Ok(TaskResult::Skipped("bad path".to_string()))), &ctx);
        assert_eq!(status, SyncStatus::Skipped);
        assert_eq!(log.entries()[0].message.as_deref(), Some("bad path"));
    }

    #[test]
    fn failed_task_is_recorded_not_propagated() {
        let (_dir, ctx, log) = ctx();
        assert_eq!(execute(&Fixed(Err("copy failed")), &ctx), SyncStatus::Failed);
        assert!(log.contains(Level::Error, "copy failed"));
        assert_eq!(log.entries()[0].status, SyncStatus::Failed);
    }

    #[test]
    fn inapplicable_task_is_not_recorded() {
        let (_dir, ctx, log) = ctx();
        assert_eq!(execute(&NeverRuns, &ctx), SyncStatus::Skipped);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn one_task_per_pairing() {
        let (_dir, ctx, _) = ctx();
        let tasks = initial_sync_tasks(&ctx);
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].name().starts_with("shared -> "));
    }
}
