use std::io::{self, Write};

/// Writes each printed value to stdout on its own line
#[derive(Debug, Default)]
pub struct StdoutPrintHandler;

impl StdoutPrintHandler {
    pub fn println(&mut self, msg: &str) {
        let mut stdout = io::stdout().lock();
        // A closed stdout shouldn't turn into a runtime error
        _ = writeln!(stdout, "{}", msg);
    }
}

/// Captures each printed value as one entry, for tests and embedders
#[derive(Debug, Default)]
pub struct BufferPrintHandler {
    lines: Vec<String>,
}

impl BufferPrintHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn println(&mut self, msg: &str) {
        self.lines.push(msg.to_string());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Hand back everything captured so far and start over
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

/// Destination for `print` output, one `println` per executed statement
#[derive(Debug)]
pub enum PrintHandler {
    Stdout(StdoutPrintHandler),
    Buffer(BufferPrintHandler),
    Silent,
}

impl PrintHandler {
    pub fn stdout() -> Self {
        PrintHandler::Stdout(StdoutPrintHandler)
    }

    pub fn buffer() -> Self {
        PrintHandler::Buffer(BufferPrintHandler::new())
    }

    pub fn println(&mut self, msg: &str) {
        match self {
            Self::Stdout(h) => h.println(msg),
            Self::Buffer(h) => h.println(msg),
            Self::Silent => {}
        }
    }

    // Empty for handlers that don't capture
    pub fn lines(&self) -> &[String] {
        match self {
            Self::Buffer(h) => h.lines(),
            Self::Stdout(_) | Self::Silent => &[],
        }
    }

    pub fn take(&mut self) -> Vec<String> {
        match self {
            Self::Buffer(h) => h.take(),
            Self::Stdout(_) | Self::Silent => Vec::new(),
        }
    }
}

impl Default for PrintHandler {
    fn default() -> Self {
        Self::stdout()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn buffer_captures_in_order() {
        let mut handler = PrintHandler::buffer();
        handler.println("1");
        handler.println("two");
        assert_eq!(["1".to_string(), "two".to_string()], handler.lines());
        assert_eq!(vec!["1".to_string(), "two".to_string()], handler.take());
        assert!(handler.lines().is_empty());
    }

    #[test]
    fn silent_discards() {
        let mut handler = PrintHandler::Silent;
        handler.println("gone");
        assert!(handler.lines().is_empty());
        assert!(handler.take().is_empty());
    }
}
