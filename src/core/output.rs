use std::io::{self, Write};
use std::sync::Mutex;

/// A text channel the host reads line by line.
///
/// Every `emit` writes one full line and flushes before returning; the host
/// polls these channels and must never wait on a partially buffered line.
pub trait LineSink: Send + Sync {
    fn emit(&self, line: &str) -> io::Result<()>;
}

/// Standard output. Rust strings are UTF-8 and are written as raw bytes,
/// so non-ASCII titles reach the host intact whatever the locale.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LineSink for StderrSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        writeln!(err, "{}", line)?;
        err.flush()
    }
}

/// Collects lines in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl LineSink for MemorySink {
    fn emit(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
        Ok(())
    }
}

impl<S: LineSink + ?Sized> LineSink for &S {
    fn emit(&self, line: &str) -> io::Result<()> {
        (**self).emit(line)
    }
}

impl<S: LineSink + ?Sized> LineSink for std::sync::Arc<S> {
    fn emit(&self, line: &str) -> io::Result<()> {
        (**self).emit(line)
    }
}
