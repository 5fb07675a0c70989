// Operator link over stdin/stdout, for running against the simulator

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, Receiver, error::TryRecvError};
use tracing::{debug, warn};

use super::{LineQueue, LineTransport, LinkError, MAX_PENDING_LINES};

pub struct StdioLink {
    lines: Receiver<String>,
    queue: LineQueue,
    closed: bool,
}

impl StdioLink {
    /// Start reading stdin in a background task. Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(MAX_PENDING_LINES);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        // Waits while the channel is full; the loop drains it every cycle
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Self::from_receiver(rx)
    }

    fn from_receiver(lines: Receiver<String>) -> Self {
        Self {
            lines,
            queue: LineQueue::new(),
            closed: false,
        }
    }

    // Move everything the reader task has delivered into the capped queue
    fn drain(&mut self) -> bool {
        loop {
            match self.lines.try_recv() {
                Ok(line) => self.queue.push(line.trim().to_string()),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

impl LineTransport for StdioLink {
    fn recv_line(&mut self) -> Result<Option<String>, LinkError> {
        let open = self.drain();
        if let Some(line) = self.queue.pop() {
            return Ok(Some(line));
        }
        // Report the close once, then behave like an idle link
        if !open && !self.closed {
            self.closed = true;
            return Err(LinkError::Closed);
        }
        Ok(None)
    }

    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}
