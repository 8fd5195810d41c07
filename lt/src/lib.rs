//! LogTail - bounded tail reads for append-only log files
//!
//! Returns the last N lines of a text file without reading the whole file.
//! The read window starts at `N + 1` bytes from the end and doubles until
//! either `N + 1` lines have been collected or the start of the file is
//! reached, so a monotonically growing log costs roughly the size of its
//! last few lines per read.
//!
//! # Example
//!
//! ```ignore
//! use logtail::{TailError, tail_lines};
//!
//! match tail_lines("logs/alpha.log", 10) {
//!     Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
//!     Err(TailError::NoLogYet(_)) => println!("no log yet"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

mod tail;

pub use tail::{TailError, tail_lines, tail_reader};

/// Default number of lines shown for a worker log
pub const DEFAULT_TAIL_LINES: usize = 10;
