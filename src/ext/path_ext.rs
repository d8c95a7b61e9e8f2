use std::path::{Path, PathBuf};

/// Formats a path for log and error messages: canonical when the path
/// exists, otherwise absolute as far as the current directory allows.
pub trait PathDisplayExt {
    fn best_effort_display(&self) -> String;
}

impl PathDisplayExt for Path {
    fn best_effort_display(&self) -> String {
        self.canonicalize()
            .or_else(|_| std::path::absolute(self))
            .unwrap_or_else(|_| self.to_path_buf())
            .display()
            .to_string()
    }
}

impl PathDisplayExt for PathBuf {
    fn best_effort_display(&self) -> String {
        self.as_path().best_effort_display()
    }
}
