use std::io::Write;

/// Sink for scan and parse diagnostics
/// `location` is either empty or a fragment like " at 'foo'" / " at end" describing the offending token
pub trait Reporter {
    fn report(&mut self, line: usize, location: &str, message: &str);
}

// A reporter that renders error messages to the output
pub struct WriteReporter<'w, W>
where
    W: Write,
{
    // Store this as a mut reference so we can't accidentally lose something like stderr().lock() inside the reporter
    // that doesn't go out of scope and cause a deadlock
    writer: &'w mut W,
}

impl<'w, W> WriteReporter<'w, W>
where
    W: Write,
{
    pub fn new(writer: &'w mut W) -> WriteReporter<'w, W> {
        WriteReporter { writer }
    }
}

impl<'w, W> Reporter for WriteReporter<'w, W>
where
    W: Write,
{
    fn report(&mut self, line: usize, location: &str, message: &str) {
        // If the write fails, we don't care
        _ = writeln!(self.writer, "[line {}] Error{}: {}", line, location, message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub location: String,
    pub message: String,
}

/// Keeps every diagnostic in memory, used by tests and embedders that render errors themselves
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingReporter {
    pub fn new() -> CollectingReporter {
        CollectingReporter::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, line: usize, location: &str, message: &str) {
        self.diagnostics.push(Diagnostic {
            line,
            location: location.to_string(),
            message: message.to_string(),
        });
    }
}

/// Track whether or not an error actually occurred and delegate to another reporter
/// The parser and session piggy back on this to know whether a pass was clean
pub struct StateTrackingReporter<'a, R: ?Sized> {
    reporter: &'a mut R,
    reported: usize,
}

impl<'a, R> StateTrackingReporter<'a, R>
where
    R: Reporter + ?Sized,
{
    pub fn new(reporter: &'a mut R) -> StateTrackingReporter<'a, R> {
        StateTrackingReporter {
            reporter,
            reported: 0,
        }
    }

    pub fn errored(&self) -> bool {
        self.reported > 0
    }

    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl<'a, R> Reporter for StateTrackingReporter<'a, R>
where
    R: Reporter + ?Sized,
{
    fn report(&mut self, line: usize, location: &str, message: &str) {
        self.reported += 1;
        self.reporter.report(line, location, message);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_reporter_formats_line() {
        let mut out = Vec::<u8>::new();
        let mut reporter = WriteReporter::new(&mut out);
        reporter.report(3, " at ';'", "Expect expression.");
        reporter.report(4, "", "Unterminated string.");
        assert_eq!(
            "[line 3] Error at ';': Expect expression.\n[line 4] Error: Unterminated string.\n",
            String::from_utf8(out).unwrap()
        );
    }

    #[test]
    fn state_tracking_counts_and_delegates() {
        let mut inner = CollectingReporter::new();
        let mut tracking = StateTrackingReporter::new(&mut inner);
        assert!(!tracking.errored());
        tracking.report(1, "", "first");
        tracking.report(2, " at end", "second");
        assert!(tracking.errored());
        assert_eq!(2, tracking.reported());
        assert_eq!(2, inner.diagnostics.len());
        assert_eq!(2, inner.diagnostics[1].line);
        assert_eq!(" at end", inner.diagnostics[1].location);
    }
}
