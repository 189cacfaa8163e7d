//! A library (and CLI) for recursive, multiplexed tailing of log files.
//!
//! Files under a root directory whose names match a set of glob patterns
//! are followed with periodic polling: a scan cadence reconciles the
//! tracked set against the filesystem, and a poll cadence drains newly
//! appended bytes into complete lines. Rotation and truncation are
//! detected per file and restart that file from offset zero.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tailmux::{GlobSet, TailEvent, TailMux};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tailmux::Error> {
//!     let globs = GlobSet::new(["*.log", "*.log.*"]);
//!     let mut mux = TailMux::new("/var/log", globs).await?;
//!
//!     let shutdown = CancellationToken::new();
//!     mux.run(
//!         Duration::from_secs(1),
//!         Duration::from_millis(200),
//!         shutdown,
//!         |event| {
//!             if let TailEvent::Line { source, line } = event {
//!                 println!("{}: {}", source.display(), line);
//!             }
//!         },
//!     )
//!     .await;
//!     Ok(())
//! }
//! ```

mod cursor;
mod discover;
mod glob;
mod printer;
mod watch;

pub use cursor::{tail_last_lines, FileIdentity, TailCursor};
pub use discover::discover_files;
pub use glob::{GlobPattern, GlobSet};
pub use printer::{ColorMode, Printer};
pub use watch::{interval_from_secs, Error, TailEvent, TailMux};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
