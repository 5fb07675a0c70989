// In-memory link: scripted inbound lines, captured outbound lines

use std::collections::VecDeque;

use super::{LineTransport, LinkError};

#[derive(Debug, Default)]
pub struct MemoryLink {
    inbound: VecDeque<String>,
    sent: Vec<String>,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inbound: lines.into_iter().map(Into::into).collect(),
            sent: Vec::new(),
        }
    }

    /// Lines written so far, oldest first
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl LineTransport for MemoryLink {
    fn recv_line(&mut self) -> Result<Option<String>, LinkError> {
        Ok(self.inbound.pop_front())
    }

    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.sent.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_per_recv() {
        let mut link = MemoryLink::with_lines(["a", "b"]);
        assert_eq!(link.recv_line().unwrap().as_deref(), Some("a"));
        assert_eq!(link.pending(), 1);
        assert_eq!(link.recv_line().unwrap().as_deref(), Some("b"));
        assert_eq!(link.recv_line().unwrap(), None);

        link.send_line("telemetry").unwrap();
        assert_eq!(link.sent(), ["telemetry".to_string()]);
    }
}
