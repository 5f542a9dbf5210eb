//! Filesystem sandbox (SPEC_FULL §3): `read_file`/`write_file`/
//! `replace_file_str` are confined to `<base>/browseruse_agent_data/`
//! and to an allow-listed set of extensions.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::{ActionError, ActionOutcome};

const ALLOWED_EXTENSIONS: &[&str] = &["md", "txt", "json", "jsonl", "csv", "pdf", "html", "xml"];

pub struct FileSystemSandbox {
    root: PathBuf,
}

impl FileSystemSandbox {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            root: base_dir.as_ref().join("browseruse_agent_data"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> ActionOutcome<PathBuf> {
        let ext = Path::new(relative)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ActionError::ExtensionNotAllowed(ext));
        }

        let candidate = self.root.join(relative);
        let normalized = normalize(&candidate);
        if !normalized.starts_with(&self.root) {
            return Err(ActionError::SandboxEscape(relative.to_string()));
        }
        Ok(normalized)
    }

    pub async fn ensure_root(&self) -> ActionOutcome<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ActionError::FileSystem(e.to_string()))
    }

    pub async fn read_file(&self, relative: &str) -> ActionOutcome<String> {
        let path = self.resolve(relative)?;
        fs::read_to_string(&path)
            .await
            .map_err(|e| ActionError::FileSystem(e.to_string()))
    }

    pub async fn write_file(&self, relative: &str, content: &str, append: bool) -> ActionOutcome<()> {
        self.ensure_root().await?;
        let path = self.resolve(relative)?;
        if append {
            use tokio::io::AsyncWriteExt;
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| ActionError::FileSystem(e.to_string()))?;
            file.write_all(content.as_bytes())
                .await
                .map_err(|e| ActionError::FileSystem(e.to_string()))
        } else {
            fs::write(&path, content)
                .await
                .map_err(|e| ActionError::FileSystem(e.to_string()))
        }
    }

    pub async fn replace_file_str(
        &self,
        relative: &str,
        search: &str,
        replace: &str,
    ) -> ActionOutcome<usize> {
        let path = self.resolve(relative)?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ActionError::FileSystem(e.to_string()))?;
        let occurrences = content.matches(search).count();
        let replaced = content.replace(search, replace);
        fs::write(&path, replaced)
            .await
            .map_err(|e| ActionError::FileSystem(e.to_string()))?;
        Ok(occurrences)
    }

    pub fn available_file_paths(&self, listed: &[PathBuf]) -> Vec<PathBuf> {
        listed
            .iter()
            .filter(|p| normalize(p).starts_with(&self.root))
            .cloned()
            .collect()
    }
}

/// Lexical `..`/`.` collapse without touching the filesystem (the path
/// may not exist yet, e.g. a `write_file` target).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = FileSystemSandbox::new(dir.path());
        sandbox.write_file("notes.md", "hello", false).await.unwrap();
        let content = sandbox.read_file("notes.md").await.unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = FileSystemSandbox::new(dir.path());
        let result = sandbox.write_file("../escape.md", "x", false).await;
        assert!(matches!(result, Err(ActionError::SandboxEscape(_))));
    }

    #[tokio::test]
    async fn rejects_disallowed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = FileSystemSandbox::new(dir.path());
        let result = sandbox.write_file("script.sh", "x", false).await;
        assert!(matches!(result, Err(ActionError::ExtensionNotAllowed(_))));
    }
}
