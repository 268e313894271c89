//! Progress callbacks for long-running crawls.

/// Progress callback for reporting crawl status to an interactive front end.
pub trait ProgressReporter {
    /// Called when a new knowledge file (or phase within one) starts.
    fn phase(&self, name: &str);
    /// Called before each page or file fetch. `total` is 0 when unknown.
    fn fetching(&self, url: &str, current: usize, total: usize);
    /// Called after a document has been appended to the output.
    fn document_written(&self, source: &str);
    /// Called once the whole run has finished.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn fetching(&self, _url: &str, _current: usize, _total: usize) {}
    fn document_written(&self, _source: &str) {}
    fn finish(&self) {}
}
