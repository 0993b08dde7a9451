//! Server-sent-event frame reassembly.
//!
//! Transport chunks arrive with arbitrary boundaries: a chunk may contain
//! several complete SSE records, or end mid-record, or even mid-UTF-8
//! sequence. [`SseFrameBuffer`] accepts raw bytes and yields the `data:`
//! payload of each complete record. Records are separated by a blank line;
//! both `\n` and `\r\n` line endings occur in the wild.

/// Incremental reassembly buffer for one SSE response body.
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    buf: Vec<u8>,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transport chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the `data` payload of the next complete record.
    ///
    /// Records without a `data` field (comments, bare `event:` lines) are
    /// consumed and skipped. Returns `None` when no complete record is
    /// buffered yet.
    pub fn next_data(&mut self) -> Option<String> {
        loop {
            let (end, sep_len) = find_record_boundary(&self.buf)?;
            let record: Vec<u8> = self.buf.drain(..end + sep_len).take(end).collect();
            if let Some(data) = extract_data(&record) {
                return Some(data);
            }
        }
    }

    /// Drain whatever trails after the last blank line once the transport
    /// has closed. A stream that ends mid-record still surfaces its final
    /// `data` payload this way.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let record = std::mem::take(&mut self.buf);
        extract_data(&record)
    }
}

/// Locate the first blank-line separator. Returns the record end offset
/// and the separator length.
fn find_record_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == b'\n' {
            if buf.get(i + 1) == Some(&b'\n') {
                return Some((i, 2));
            }
            if buf.get(i + 1) == Some(&b'\r') && buf.get(i + 2) == Some(&b'\n') {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

/// Join the `data:` field lines of one record, per the SSE text framing.
fn extract_data(record: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(record);
    let mut parts: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("data:") {
            parts.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
