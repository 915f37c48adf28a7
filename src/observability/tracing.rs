use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::logging::default_filter;

/// JSON-formatted structured logging, selected with `LOG_FORMAT=json`
pub fn init_structured_logging() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .json();

    if tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Global tracing subscriber already set");
    }
}
