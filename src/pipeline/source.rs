//! Message source abstraction for backend traffic.
//!
//! Sources yield raw JSON lines; parsing happens in the engine so malformed
//! lines are counted alongside everything else.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Events produced by a message source.
#[derive(Debug, PartialEq, Eq)]
pub enum SourceEvent {
    /// One non-empty line of input.
    Message(String),
    /// No more data.
    Eof,
}

/// Where backend messages come from.
///
/// The ingest loop calls [`next_message`](MessageSource::next_message) in a
/// `select!` with cancellation.
#[async_trait]
pub trait MessageSource: Send + 'static {
    async fn next_message(&mut self) -> Result<SourceEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Replay Source (recorded JSON lines)
// ============================================================================

/// Replays pre-loaded lines with a fixed delay between them.
pub struct ReplaySource {
    lines: std::vec::IntoIter<String>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(lines: Vec<String>, delay_ms: u64) -> Self {
        Self {
            lines: lines.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }

    /// Load a JSON-lines recording; blank lines are skipped.
    pub fn from_file(path: &Path, delay_ms: u64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading replay file {}", path.display()))?;
        let lines = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self::new(lines, delay_ms))
    }
}

#[async_trait]
impl MessageSource for ReplaySource {
    async fn next_message(&mut self) -> Result<SourceEvent> {
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.lines.next() {
            Some(line) => {
                self.yielded_first = true;
                Ok(SourceEvent::Message(line))
            }
            None => Ok(SourceEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Stdin Source (one JSON message per line)
// ============================================================================

/// Reads messages from stdin.
///
/// Used with the synthetic backend: `belt-simulator | beltsync --stdin`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(4096),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSource for StdinSource {
    async fn next_message(&mut self) -> Result<SourceEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SourceEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if !line.is_empty() {
                return Ok(SourceEvent::Message(line.to_string()));
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}
