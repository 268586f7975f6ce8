use slog::{o, Discard, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};

/// Builds the terminal `slog` Logger used by the binaries.
///
/// The `prefix` names the subsystem (e.g. `"adserver"`) and shows up as a
/// key on every record.
pub fn new_logger(prefix: &str) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!("prefix" => prefix.to_string()))
}

/// A Logger that drops every record, for tests.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}
