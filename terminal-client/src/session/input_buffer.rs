// terminal-client/src/session/input_buffer.rs

/// Characters typed since the last committed line.
///
/// Lives independently of any transport handle: typing while offline still
/// lands here. Only a commit, an explicit reset, or a fresh connection's open
/// handler empties it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    line: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, ch: char) {
        self.line.push(ch);
    }

    /// Remove the last character. Returns false on an empty buffer.
    pub fn backspace(&mut self) -> bool {
        self.line.pop().is_some()
    }

    /// Take the buffered line, leaving the buffer empty
    pub fn commit(&mut self) -> String {
        std::mem::take(&mut self.line)
    }

    pub fn reset(&mut self) {
        self.line.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Length in characters, not bytes
    pub fn len(&self) -> usize {
        self.line.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_commit() {
        let mut buffer = InputBuffer::new();
        for ch in "ls -la".chars() {
            buffer.append(ch);
        }
        assert_eq!(buffer.as_str(), "ls -la");
        assert_eq!(buffer.commit(), "ls -la");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut buffer = InputBuffer::new();
        assert!(!buffer.backspace());
        assert!(!buffer.backspace());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_backspace_removes_one_char() {
        let mut buffer = InputBuffer::new();
        buffer.append('c');
        buffer.append('é');
        assert_eq!(buffer.len(), 2);
        assert!(buffer.backspace());
        assert_eq!(buffer.as_str(), "c");
    }

    #[test]
    fn test_reset_discards() {
        let mut buffer = InputBuffer::new();
        buffer.append('x');
        buffer.reset();
        assert_eq!(buffer.commit(), "");
    }
}
