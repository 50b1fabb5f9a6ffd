//! Global [`tracing`] subscriber: coloured console output plus a plain
//! per-command log file.
use std::fs::File;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::utils::{LineKind, clock, escape_control, file_line, log_file_path, timestamp};
use crate::cli::VERSION;

/// The formatted `message` field of an event.
fn message_of(event: &tracing::Event<'_>) -> String {
    struct Message(String);

    impl Visit for Message {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                value.clone_into(&mut self.0);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    let mut message = Message(String::new());
    event.record(&mut message);
    message.0
}

/// Appends every event, debug included, to the command's log file.
///
/// The file is truncated when the layer is created so it only holds the
/// current run; a long watch session keeps appending to it.
#[derive(Debug)]
struct LogFileLayer {
    out: Mutex<File>,
}

impl LogFileLayer {
    fn open(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let mut out = File::create(&path).ok()?;
        writeln!(out, "# molerat {VERSION} {command}, started {}", timestamp()).ok()?;
        Some(Self {
            out: Mutex::new(out),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogFileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let line = file_line(LineKind::of(event.metadata()), &timestamp(), &message_of(event));
        if let Ok(mut out) = self.out.lock() {
            writeln!(out, "{line}").ok();
        }
    }
}

/// Console output: bold stage headers, dimmed clock, coloured warnings and
/// errors.
struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let message = message_of(event);
        let msg = escape_control(&message);
        let time = clock();
        match LineKind::of(event.metadata()) {
            LineKind::Stage => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            LineKind::Error => writeln!(writer, "\x1b[2m{time}\x1b[0m \x1b[1;31merror:\x1b[0m {msg}"),
            LineKind::Warn => writeln!(writer, "\x1b[2m{time}\x1b[0m \x1b[33mwarning:\x1b[0m {msg}"),
            LineKind::Info => writeln!(writer, "\x1b[2m{time}\x1b[0m {msg}"),
            LineKind::Debug => writeln!(writer, "\x1b[2m{time} {msg}\x1b[0m"),
        }
    }
}

/// Install the global subscriber.
///
/// The console shows `info` and above (`debug` with `verbose`, or whatever
/// `RUST_LOG` selects); warnings and errors go to stderr. The log file at
/// `<cache home>/molerat/<command>.log` always records `debug` and above.
/// Call once, before anything is logged.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;
    use tracing_subscriber::{Layer as _, fmt};

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(
            std::io::stderr
                .with_max_level(tracing::Level::WARN)
                .or_else(std::io::stdout),
        )
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        );
    let file = LogFileLayer::open(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}
