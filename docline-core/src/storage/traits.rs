// src/storage/traits.rs
//! Line store abstraction
//!
//! The persistence layer only needs a line-oriented resource it can read from
//! start to end and rewrite wholesale. Backends:
//!
//! ```text
//! LineStore (trait)
//!   ├── FileStore   (a file on disk, one JSON document per line)
//!   └── MemoryStore (an in-memory buffer, the ":memory:" collection)
//! ```

use std::io;

/// Sequential line reader and truncate-and-rewrite sink
pub trait LineStore {
    /// Read every line from the start of the resource, without terminators.
    ///
    /// Lines are raw bytes; decoding them is the caller's job.
    fn read_lines(&mut self) -> io::Result<Vec<Vec<u8>>>;

    /// Discard all content; the next write starts at offset zero
    fn truncate(&mut self) -> io::Result<()>;

    /// Append one line (a terminator is added)
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push buffered writes to the underlying resource
    fn flush(&mut self) -> io::Result<()>;

    /// Human-readable name of the resource, for logs
    fn describe(&self) -> String;
}
