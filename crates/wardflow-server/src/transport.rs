//! The shipped transport: one message body per line, to stdout or a file.

use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::Path;

use parking_lot::Mutex;
use wardflow_core::Result;
use wardflow_engine::Transport;

enum LineWriter {
    Stdout(Stdout),
    File(File),
}

impl LineWriter {
    fn write_line(&mut self, body: &[u8]) -> io::Result<()> {
        match self {
            Self::Stdout(stdout) => {
                let mut lock = stdout.lock();
                lock.write_all(body)?;
                lock.write_all(b"\n")?;
                lock.flush()
            }
            Self::File(file) => {
                file.write_all(body)?;
                file.write_all(b"\n")?;
                file.flush()
            }
        }
    }
}

/// Writes each message as one line. Messages never contain newlines, so
/// downstream consumers can split on them.
pub struct LineTransport {
    writer: Mutex<LineWriter>,
}

impl LineTransport {
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(LineWriter::Stdout(io::stdout())),
        }
    }

    /// Appends to `path`, creating it when missing, so a restarted simulator
    /// continues the same output file.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(LineWriter::File(file)),
        })
    }
}

impl Transport for LineTransport {
    fn send(&self, body: &[u8]) -> Result<()> {
        self.writer.lock().write_line(body)?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        match &mut *self.writer.lock() {
            LineWriter::Stdout(stdout) => stdout.lock().flush()?,
            LineWriter::File(file) => file.flush()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_transport_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.out");

        let transport = LineTransport::file(&path).unwrap();
        transport.send(b"ADT^A01|first").unwrap();
        transport.send(b"ADT^A03|second").unwrap();
        transport.close().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "ADT^A01|first\nADT^A03|second\n");
    }

    #[test]
    fn test_file_transport_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.out");

        LineTransport::file(&path).unwrap().send(b"before").unwrap();
        LineTransport::file(&path).unwrap().send(b"after").unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "before\nafter\n");
    }
}
