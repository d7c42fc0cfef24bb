//! Sandboxed file tools for code-reading agents.
//!
//! Agents may explore a project but must stay inside it. [`FileTools`]
//! confines every path to a base directory, skips hidden entries and build
//! output, and truncates large files so a single read cannot blow the
//! model's context.
//!
//! Failures are returned as plain strings rather than errors: tool output
//! is fed back to the model verbatim, and a readable "Error: …" line lets
//! the model correct its next request.

use std::path::{Component, Path, PathBuf};

/// Reads are truncated past this many bytes.
const MAX_READ_BYTES: usize = 20_000;

/// Directory-confined file access.
#[derive(Debug, Clone)]
pub struct FileTools {
    base_dir: PathBuf,
}

impl FileTools {
    /// Confine all access to `base_dir` and below.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a relative path inside the sandbox. Absolute paths and any
    /// `..` component are refused outright.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return None;
        }
        for component in candidate.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return None,
            }
        }
        Some(self.base_dir.join(candidate))
    }

    /// List entries of a directory, one name per line. Hidden entries and
    /// build artifacts are filtered out.
    pub fn list_files(&self, directory: &str) -> String {
        let Some(path) = self.resolve(directory) else {
            return "Error: Access denied. Path outside project root.".to_string();
        };

        let entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) => return format!("Error listing directory: {err}"),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.') && name != "target" && name != "node_modules")
            .collect();
        names.sort();
        names.join("\n")
    }

    /// Read a file's content, truncated past [`MAX_READ_BYTES`].
    pub fn read_file(&self, file_path: &str) -> String {
        let Some(path) = self.resolve(file_path) else {
            return "Error: Access denied. Path outside project root.".to_string();
        };

        if !path.exists() {
            return format!("Error: File '{file_path}' does not exist.");
        }

        match std::fs::read_to_string(&path) {
            Ok(content) if content.len() > MAX_READ_BYTES => {
                let mut cut = MAX_READ_BYTES;
                while !content.is_char_boundary(cut) {
                    cut -= 1;
                }
                format!("{}\n...[TRUNCATED]", &content[..cut])
            }
            Ok(content) => content,
            Err(err) => format!("Error reading file: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn escaping_paths_are_denied() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FileTools::new(dir.path());

        assert!(tools.read_file("../outside.txt").starts_with("Error: Access denied"));
        assert!(tools.read_file("/etc/hostname").starts_with("Error: Access denied"));
        assert!(tools.list_files("..").starts_with("Error: Access denied"));
    }

    #[test]
    fn reads_and_lists_inside_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TODO.md"), "- [ ] fix parser\n").unwrap();
        fs::write(dir.path().join(".secret"), "hidden").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();

        let tools = FileTools::new(dir.path());
        assert_eq!(tools.list_files("."), "TODO.md");
        assert_eq!(tools.read_file("TODO.md"), "- [ ] fix parser\n");
    }

    #[test]
    fn missing_file_reports_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FileTools::new(dir.path());
        assert_eq!(
            tools.read_file("nope.rs"),
            "Error: File 'nope.rs' does not exist."
        );
    }

    #[test]
    fn oversized_reads_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(MAX_READ_BYTES + 500)).unwrap();

        let tools = FileTools::new(dir.path());
        let content = tools.read_file("big.txt");
        assert!(content.ends_with("...[TRUNCATED]"));
        assert!(content.len() < MAX_READ_BYTES + 100);
    }
}
