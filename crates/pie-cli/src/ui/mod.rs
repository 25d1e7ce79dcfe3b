//! Terminal output for the session: status lines, build spinner and the
//! compile diagnostics list.
//!
//! Everything goes to stderr; stdout only carries the artifact path printed
//! by `pie pack`.

mod format;
mod messages;
mod spinner;

pub use format::{format_duration, format_size};
pub use messages::{diagnostics, error, info, success, warning};
pub use spinner::Spinner;
