//! Reverse-window tail implementation

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from tail reads
#[derive(Debug, Error)]
pub enum TailError {
    /// The file has not been created yet (worker never started)
    #[error("No log yet: {}", .0.display())]
    NoLogYet(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TailError {
    /// True when the log file simply doesn't exist yet
    pub fn is_no_log_yet(&self) -> bool {
        matches!(self, TailError::NoLogYet(_))
    }
}

/// Read the last `n` lines of the file at `path`
pub fn tail_lines(path: impl AsRef<Path>, n: usize) -> Result<Vec<String>, TailError> {
    let path = path.as_ref();
    debug!(path = %path.display(), n, "tail_lines: called");

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TailError::NoLogYet(path.to_path_buf()));
        }
        Err(source) => {
            return Err(TailError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    tail_reader(&mut file, n).map_err(|source| TailError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the last `n` lines from any seekable reader
///
/// A trailing line without a newline counts as a line. Invalid UTF-8 is
/// replaced lossily.
pub fn tail_reader<R: Read + Seek>(reader: &mut R, n: usize) -> io::Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let size = reader.seek(SeekFrom::End(0))?;
    let mut window = (n as u64).saturating_add(1);
    let mut buf = Vec::new();

    loop {
        let (offset, at_start) = if window >= size {
            (0, true)
        } else {
            (size - window, false)
        };

        reader.seek(SeekFrom::Start(offset))?;
        buf.clear();
        reader.read_to_end(&mut buf)?;

        let collected = String::from_utf8_lossy(&buf).lines().count();
        debug!(offset, window, collected, "tail_reader: read window");

        if collected > n || at_start {
            break;
        }
        window = window.saturating_mul(2);
    }

    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(n);
    Ok(lines[skip..].iter().map(|line| line.to_string()).collect())
}
