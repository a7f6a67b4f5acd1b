//! Default per-line forwarding callbacks.
//!
//! Unless a run catches its output, every line read from the child is
//! handed to a callback. The defaults below mirror the line onto the
//! caller's own standard streams and flush immediately, so nothing sits
//! in a buffer if the child is killed mid-stream.

use std::io::Write;

/// Per-line callback invoked from the stream drains.
pub type LineCallback = Box<dyn FnMut(&str) + Send + 'static>;

/// Write a line to the real stdout and flush.
pub fn forward_to_stdout(line: &str) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(line.as_bytes());
    let _ = stdout.flush();
}

/// Write a line to the real stderr and flush.
pub fn forward_to_stderr(line: &str) {
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(line.as_bytes());
    let _ = stderr.flush();
}
