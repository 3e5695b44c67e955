//! CLI command handlers. Each command is in its own file.

mod keys;
mod list;
mod watch;

pub use keys::run_keys;
pub use list::run_list;
pub use watch::run_watch;

#[cfg(test)]
pub(crate) use list::render;
#[cfg(test)]
pub(crate) use watch::format_bytes;
