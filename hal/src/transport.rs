//! A channel's byte transport (§9: "the source uses free-function
//! callbacks (e.g. UART ISR → event queue). In the target, channels
//! implement a small polymorphic contract"). `ChannelTransport` is the
//! half of that contract the hardware/network side owns; the line-editing
//! and realtime-byte decoding half lives in `fluidnc_channel`.

/// A byte-oriented source/sink: UART, TCP socket, USB-CDC, a file replay,
/// or a test double. Reads/writes never block past their own timeout
/// handling (§5: "UART reads use a configured byte-timeout").
pub trait ChannelTransport: Send {
    fn name(&self) -> &str;

    /// Bytes known to be available without blocking.
    fn available(&self) -> usize;

    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> usize;
}

/// An in-memory transport for tests and the `fluidnc` binary's demo mode:
/// a pair of byte queues, fed and drained directly instead of through a
/// real UART/socket.
pub struct LoopbackTransport {
    name: String,
    inbound: std::collections::VecDeque<u8>,
    outbound: Vec<u8>,
}

impl LoopbackTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inbound: std::collections::VecDeque::new(),
            outbound: Vec::new(),
        }
    }

    /// Feed bytes as if they arrived over the wire.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Drain everything written so far (what the channel sent back).
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl ChannelTransport for LoopbackTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn available(&self) -> usize {
        self.inbound.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            let Some(b) = self.inbound.pop_front() else { break };
            buf[n] = b;
            n += 1;
        }
        n
    }

    fn write(&mut self, data: &[u8]) -> usize {
        self.outbound.extend_from_slice(data);
        data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_echoes_what_was_pushed() {
        let mut t = LoopbackTransport::new("test");
        t.push_input(b"G1 X1\n");
        let mut buf = [0u8; 16];
        let n = t.read(&mut buf);
        assert_eq!(&buf[..n], b"G1 X1\n");
    }

    #[test]
    fn write_is_captured_for_inspection() {
        let mut t = LoopbackTransport::new("test");
        t.write(b"ok\n");
        assert_eq!(t.take_output(), b"ok\n");
    }
}
