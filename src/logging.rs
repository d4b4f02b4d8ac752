//! Log output setup for the command-line tool.
//!
//! Everything goes to stderr through an `EnvFilter`. A run also keeps its
//! warnings and errors in `<outdir>/<stem>.log`, replaced on every run.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Stderr layer. `RUST_LOG` takes precedence over `verbosity`.
fn stderr_layer<S>(verbosity: u8) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_for(verbosity).into());
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

/// Plain-text layer keeping warnings and errors in `file`.
pub fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::WARN)
}

/// Create the run's log file, removing the one a previous run left behind.
///
/// # Errors
/// Returns error if the directory can't be created or the file can't be
/// removed or created
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    File::create(path)
}

/// Install the global subscriber: stderr, plus `log_file` when given.
///
/// Does nothing if a global subscriber is already set.
pub fn init(verbosity: u8, log_file: Option<File>) {
    let _ = tracing_subscriber::registry()
        .with(stderr_layer(verbosity))
        .with(log_file.map(file_layer))
        .try_init();
}

/// Run `f` with a stderr-only subscriber on this thread.
///
/// Used for the work done before the output directory, and with it the log
/// file, is known.
pub fn scoped<T>(verbosity: u8, f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::registry().with(stderr_layer(verbosity));
    tracing::subscriber::with_default(subscriber, f)
}
