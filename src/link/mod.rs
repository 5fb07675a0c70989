// Line-oriented link to the operator
//
// Commands arrive as newline-terminated text lines; telemetry leaves the same way.
// At most one inbound line is handed out per call; up to MAX_PENDING_LINES
// more stay buffered, newest kept.

mod memory;
mod serial;
mod stdio;

pub use memory::MemoryLink;
pub use serial::SerialLink;
pub use stdio::StdioLink;

use std::collections::VecDeque;

use tracing::warn;

/// Longest line kept while waiting for its newline
pub const MAX_LINE_BYTES: usize = 256;

/// Complete lines held between cycles; older ones are dropped past this
pub const MAX_PENDING_LINES: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Link closed")]
    Closed,
}

pub trait LineTransport {
    /// Next complete line, or `None` if no full line has arrived yet
    fn recv_line(&mut self) -> Result<Option<String>, LinkError>;

    /// Write one line; the newline is added here
    fn send_line(&mut self, line: &str) -> Result<(), LinkError>;
}

/// Complete lines waiting to be handed out, capped at [`MAX_PENDING_LINES`].
///
/// When full, the oldest line is discarded so the newest command (a STOP,
/// say) is never stuck behind a backlog.
#[derive(Debug, Default)]
pub struct LineQueue {
    lines: VecDeque<String>,
    dropped: u64,
}

impl LineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() >= MAX_PENDING_LINES {
            let stale = self.lines.pop_front().unwrap_or_default();
            self.dropped += 1;
            warn!(
                "Line backlog full ({} lines), dropping oldest: {:?}",
                MAX_PENDING_LINES, stale
            );
        }
        self.lines.push_back(line);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Accumulates raw bytes and splits them into trimmed lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
    complete: LineQueue,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.partial.extend_from_slice(bytes);
        while let Some(newline) = self.partial.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=newline).collect();
            self.complete
                .push(String::from_utf8_lossy(&line).trim().to_string());
        }
        if self.partial.len() > MAX_LINE_BYTES {
            warn!(
                "Dropping {} bytes of unterminated input",
                self.partial.len()
            );
            self.partial.clear();
        }
    }

    /// Take the oldest complete line, trimmed of whitespace and `\r`
    pub fn pop_line(&mut self) -> Option<String> {
        self.complete.pop()
    }

    /// Complete lines currently held
    pub fn pending(&self) -> usize {
        self.complete.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_pushes() {
        let mut buf = LineBuffer::new();
        buf.push(b"{\"cmd\":\"dr");
        assert_eq!(buf.pop_line(), None);

        buf.push(b"ive\"}\r\n{\"cmd\":");
        assert_eq!(buf.pop_line().as_deref(), Some("{\"cmd\":\"drive\"}"));
        assert_eq!(buf.pop_line(), None);

        buf.push(b"\"action\"}\n\n");
        assert_eq!(buf.pop_line().as_deref(), Some("{\"cmd\":\"action\"}"));
        assert_eq!(buf.pop_line().as_deref(), Some(""));
        assert_eq!(buf.pop_line(), None);
    }

    #[test]
    fn test_runaway_input_is_dropped() {
        let mut buf = LineBuffer::new();
        buf.push(&[b'x'; MAX_LINE_BYTES + 1]);
        buf.push(b"ok\n");
        assert_eq!(buf.pop_line().as_deref(), Some("ok"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut buf = LineBuffer::new();
        buf.push(&[0xFF, b'a', b'\n']);
        assert_eq!(buf.pop_line().as_deref(), Some("\u{FFFD}a"));
    }

    #[test]
    fn test_backlog_keeps_newest_lines() {
        let mut buf = LineBuffer::new();
        let mut input = String::new();
        for i in 0..MAX_PENDING_LINES {
            input.push_str(&format!(
                "{{\"cmd\":\"drive\",\"left\":{},\"right\":{}}}\n",
                i, i
            ));
        }
        input.push_str("{\"cmd\":\"action\",\"name\":\"STOP\"}\n");
        buf.push(input.as_bytes());
        assert_eq!(buf.pending(), MAX_PENDING_LINES);

        let lines: Vec<String> = std::iter::from_fn(|| buf.pop_line()).collect();
        assert_eq!(lines.len(), MAX_PENDING_LINES);
        // Only the very first drive was dropped
        assert_eq!(lines[0], "{\"cmd\":\"drive\",\"left\":1,\"right\":1}");
        assert_eq!(
            lines.last().map(String::as_str),
            Some("{\"cmd\":\"action\",\"name\":\"STOP\"}")
        );
    }

    #[test]
    fn test_queue_drops_oldest_when_full() {
        let mut queue = LineQueue::new();
        for i in 0..MAX_PENDING_LINES + 3 {
            queue.push(i.to_string());
        }
        assert_eq!(queue.len(), MAX_PENDING_LINES);
        assert_eq!(queue.dropped(), 3);
        assert_eq!(queue.pop().as_deref(), Some("3"));
    }
}
