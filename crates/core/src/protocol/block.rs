//! Raw response block for one command round trip

/// Lines received for one command, terminator excluded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBlock {
    lines: Vec<String>,
}

impl ResponseBlock {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub(crate) fn push(&mut self, line: String) {
        self.lines.push(line);
    }
}

impl From<Vec<String>> for ResponseBlock {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}
