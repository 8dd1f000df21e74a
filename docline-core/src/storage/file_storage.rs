// storage/file_storage.rs
//! File-backed line store
//!
//! The file handle lives inside the store; dropping the store closes it, so
//! every exit path of the owning collection releases the descriptor.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::traits::LineStore;
use crate::options::OpenMode;

/// One JSON document per line in a plain file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    mode: OpenMode,
    file: BufWriter<File>,
}

impl FileStore {
    /// Open `path` according to `mode`.
    ///
    /// `Read` requires the file to exist; `Append` and `Truncate` create it.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.read(true);
        match mode {
            OpenMode::Read => {}
            OpenMode::Append => {
                options.write(true).create(true);
            }
            OpenMode::Truncate => {
                options.write(true).create(true).truncate(true);
            }
        }
        let file = options.open(&path)?;
        Ok(FileStore {
            path,
            mode,
            file: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    fn ensure_writable(&self) -> io::Result<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("'{}' was opened read-only", self.path.display()),
            ))
        }
    }
}

impl LineStore for FileStore {
    fn read_lines(&mut self) -> io::Result<Vec<Vec<u8>>> {
        self.file.flush()?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0))?;
        BufReader::new(file)
            .split(b'\n')
            .map(|line| {
                let mut line = line?;
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Ok(line)
            })
            .collect()
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.ensure_writable()?;
        self.file.flush()?;
        let file = self.file.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.ensure_writable()?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.mode.is_writable() {
            self.file.get_ref().sync_data()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
