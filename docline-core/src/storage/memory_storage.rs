// storage/memory_storage.rs
//! In-memory line store backing `":memory:"` collections and tests

use std::io;

use super::traits::LineStore;
use crate::options::MEMORY;

/// Line store over an owned byte buffer. Nothing outlives the collection.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    buffer: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing JSON-lines content
    pub fn with_contents(contents: impl Into<String>) -> Self {
        MemoryStore {
            buffer: contents.into(),
        }
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }
}

impl LineStore for MemoryStore {
    fn read_lines(&mut self) -> io::Result<Vec<Vec<u8>>> {
        Ok(self.buffer.lines().map(|line| line.as_bytes().to_vec()).collect())
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.buffer.clear();
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        MEMORY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_replaces_content() {
        let mut store = MemoryStore::with_contents("{\"_id\":\"old\"}\n");
        assert_eq!(store.read_lines().unwrap(), vec![b"{\"_id\":\"old\"}".to_vec()]);

        store.truncate().unwrap();
        store.write_line("one").unwrap();
        store.write_line("two").unwrap();
        store.flush().unwrap();

        assert_eq!(store.contents(), "one\ntwo\n");
        assert_eq!(store.read_lines().unwrap(), vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_describe_is_memory_name() {
        assert_eq!(MemoryStore::new().describe(), ":memory:");
    }
}
