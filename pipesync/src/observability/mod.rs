//! Observability utilities.
//!
//! Everything logs through `tracing`. Binaries call [`init_tracing`] once;
//! the library never installs a subscriber on its own.

mod tracing;

pub use self::tracing::{init_tracing, session_span, try_init_tracing, LogFormat, DEFAULT_DIRECTIVE};
