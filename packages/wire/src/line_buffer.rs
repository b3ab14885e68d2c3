/// Byte-level line splitter that holds back an unterminated trailing line.
///
/// Splitting happens on raw bytes, so a chunk boundary inside a multi-byte
/// UTF-8 character never corrupts text: a line is only decoded once its
/// terminating `\n` has arrived.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, without terminators.
    /// A trailing `\r` is stripped so CRLF upstreams behave like LF ones.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let mut line = &self.pending[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Bytes received after the last newline.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }

    /// Drains the unterminated remainder, if it holds anything besides whitespace.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let rest = String::from_utf8_lossy(&rest).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_is_held_back() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(buf.remainder(), b"data: {\"a\"");
        assert_eq!(buf.push(b":1}\n\n"), vec!["data: {\"a\":1}", ""]);
        assert!(buf.remainder().is_empty());
    }

    #[test]
    fn test_crlf_is_normalized() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"data: x\r\n"), vec!["data: x"]);
    }

    #[test]
    fn test_split_inside_multibyte_char() {
        let text = "data: 안녕하세요\n";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut buf = LineBuffer::new();
            let mut lines = buf.push(&bytes[..split]);
            lines.extend(buf.push(&bytes[split..]));
            assert_eq!(lines, vec!["data: 안녕하세요"], "split at {split}");
        }
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut buf = LineBuffer::new();
        buf.push(b"one\ntwo");
        assert_eq!(buf.finish().as_deref(), Some("two"));
        assert!(buf.finish().is_none());
    }
}
