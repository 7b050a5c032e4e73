use anyhow::Result;
use std::collections::VecDeque;

/// Incremental line framer for SSE bodies
///
/// Bytes arrive in arbitrary chunks; complete lines are handed out as soon
/// as their `\n` shows up and the trailing partial line stays buffered until
/// the next chunk (or `finish`). Lines are decoded only once complete, so a
/// multi-byte character split across chunks is never cut in half.
pub struct SseLineDecoder {
    buffer: VecDeque<u8>,
}

impl SseLineDecoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode_line(&line_bytes))
    }

    /// Feed a chunk and collect every line it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<String>> {
        self.extend(bytes);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        lines
    }

    /// Flush the trailing partial line at end of stream
    pub fn finish(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        let line = decode_line(&rest);
        match line {
            Ok(ref s) if s.is_empty() => None,
            other => Some(other),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for SseLineDecoder {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}

fn decode_line(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(line_str) => Ok(line_str.trim().to_string()),
        Err(e) => Err(anyhow::anyhow!("Invalid UTF-8: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines() {
        let mut decoder = SseLineDecoder::with_capacity(64);

        decoder.extend(b"line1\nline2\n");

        assert_eq!(decoder.next_line().unwrap().unwrap(), "line1");
        assert_eq!(decoder.next_line().unwrap().unwrap(), "line2");
        assert!(decoder.next_line().is_none());
    }

    #[test]
    fn test_partial_line_kept_across_chunks() {
        let mut decoder = SseLineDecoder::with_capacity(64);

        assert!(decoder.feed(b"data: {\"mess").is_empty());
        let lines = decoder.feed(b"age\":\"hi\"}\n\n");
        let lines: Vec<String> = lines.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["data: {\"message\":\"hi\"}".to_string(), String::new()]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "data: {\"message\":\"café\"}\n".as_bytes();
        // split inside the two-byte 'é'
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = SseLineDecoder::default();

        assert!(decoder.feed(&text[..split]).is_empty());
        let lines = decoder.feed(&text[split..]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap(), "data: {\"message\":\"café\"}");
    }

    #[test]
    fn test_finish_flushes_remainder() {
        let mut decoder = SseLineDecoder::default();
        decoder.extend(b"data: {\"done\":true}");
        assert!(decoder.next_line().is_none());
        assert_eq!(decoder.finish().unwrap().unwrap(), "data: {\"done\":true}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_crlf_lines_are_trimmed() {
        let mut decoder = SseLineDecoder::default();
        let lines = decoder.feed(b"data: x\r\n");
        assert_eq!(lines[0].as_ref().unwrap(), "data: x");
    }
}
