use std::path::{Path, PathBuf};

/// Per-invocation accumulator for log text and cleanup bookkeeping.
///
/// Log fragments are staged in temporary buffers first. The orchestrator
/// flushes them per record and per archive, which is what allows each
/// notification digest to carry only the fragment that belongs to it.
/// Deletion is restricted to paths recorded here during the run, never a
/// broader directory sweep.
#[derive(Default)]
pub struct ImportRun {
    log: String,
    error_log: String,
    temporary_log: String,
    temporary_error_log: String,
    deletable: Vec<PathBuf>,
}

impl ImportRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record positive progress. Errors go through [`ImportRun::error`]
    /// so they also land in the error-only log.
    pub fn log(&mut self, message: &str) {
        self.temporary_log.push_str(message);
        self.temporary_log.push('\n');
    }

    /// Record an error. The message shows up in both the full log and the
    /// error log.
    pub fn error(&mut self, message: &str) {
        self.temporary_error_log.push_str(message);
        self.temporary_error_log.push('\n');
        self.log(message);
    }

    /// Current unflushed log fragment, used for notification digests.
    pub fn pending_log(&self) -> &str {
        &self.temporary_log
    }

    /// Current unflushed error fragment.
    pub fn pending_errors(&self) -> &str {
        &self.temporary_error_log
    }

    /// Move the temporary buffers into the run-wide logs.
    pub fn flush(&mut self) {
        self.log.push_str(&self.temporary_log);
        self.temporary_log.clear();
        self.error_log.push_str(&self.temporary_error_log);
        self.temporary_error_log.clear();
    }

    /// Mark a path as eligible for deletion during cleanup.
    pub fn allow_deletion(&mut self, path: &Path) {
        if !self.deletable.iter().any(|known| known == path) {
            self.deletable.push(path.to_path_buf());
        }
    }

    pub fn may_delete(&self, path: &Path) -> bool {
        self.deletable.iter().any(|known| known == path)
    }

    /// The complete log text of the run. Call after a final flush.
    pub fn into_log(mut self) -> String {
        self.flush();
        self.log
    }
}
