// Operator link over a serial port

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use super::{LineBuffer, LineTransport, LinkError};

/// Reads never block longer than this
const READ_TIMEOUT_MS: u64 = 1;

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    buffer: LineBuffer,
}

impl SerialLink {
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self, LinkError> {
        info!("Opening serial link on {} @ {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()?;

        Ok(Self {
            port,
            buffer: LineBuffer::new(),
        })
    }

    /// Move whatever bytes are waiting into the line buffer
    fn fill(&mut self) -> Result<(), LinkError> {
        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(());
        }

        let mut chunk = vec![0u8; available];
        match self.port.read(&mut chunk) {
            Ok(n) => self.buffer.push(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => return Err(LinkError::Io(e)),
        }
        Ok(())
    }
}

impl LineTransport for SerialLink {
    fn recv_line(&mut self) -> Result<Option<String>, LinkError> {
        if let Some(line) = self.buffer.pop_line() {
            return Ok(Some(line));
        }
        self.fill()?;
        Ok(self.buffer.pop_line())
    }

    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }
}
