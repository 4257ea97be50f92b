//! Pending-fragment buffer: turns unaligned chunks into complete lines.

/// Holds the unterminated tail of a stream between chunks.
///
/// Works on bytes so a multi-byte UTF-8 sequence split across two chunks
/// is decoded only once the whole line is present.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, in arrival order.
    /// `\n`, `\r\n` and bare `\r` all terminate a line; empty lines are dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in chunk {
            if b == b'\n' || b == b'\r' {
                self.take_line(&mut lines);
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Flush the trailing fragment at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::with_capacity(1);
        self.take_line(&mut lines);
        lines.pop()
    }

    /// Bytes currently held back waiting for a terminator.
    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self, out: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out.push(line);
    }
}
