//! Document transport: where configuration documents come from and where the
//! task list goes.
//!
//! The engine only sees the `DocumentTransport` trait. `FileTransport` is the
//! local-filesystem implementation; remote sources (signed URLs, retrying
//! HTTP clients) belong to other transports and are rejected here with
//! `TransportError::UnsupportedRoot`.

use crate::document::Document;
use crate::error::TransportError;
use crate::task::TaskEntry;
use crate::types::WriteMode;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads configuration documents and persists task lists.
pub trait DocumentTransport {
    /// Fetch and parse the document `file` under `root`.
    fn read(&self, root: &str, file: &str) -> Result<Document, TransportError>;

    /// Persist `tasks` to `path`.
    fn write(&self, path: &Path, tasks: &[TaskEntry], mode: WriteMode) -> Result<(), TransportError>;
}

/// Join a nested path onto a root the way config locations compose.
///
/// An empty side yields the other; separators are collapsed at the seam.
pub fn join_root(root: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return root.to_string();
    }
    if root.is_empty() {
        return path.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), path)
}

fn is_remote(root: &str) -> bool {
    root.contains("://")
}

/// Local filesystem transport.
///
/// Relative roots resolve against `base`; absolute roots are used as-is.
#[derive(Debug, Clone)]
pub struct FileTransport {
    base: PathBuf,
}

impl FileTransport {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Filesystem location of `file` under `root`
    pub fn resolve(&self, root: &str, file: &str) -> Result<PathBuf, TransportError> {
        if is_remote(root) {
            return Err(TransportError::UnsupportedRoot {
                root: root.to_string(),
            });
        }
        let root = Path::new(root);
        let dir = if root.is_absolute() {
            root.to_path_buf()
        } else {
            self.base.join(root)
        };
        Ok(dir.join(file))
    }

    /// Load a task list written by `write`. A missing or empty file is an
    /// empty list.
    pub fn read_tasks(path: &Path) -> Result<Vec<TaskEntry>, TransportError> {
        let location = path.display().to_string();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(TransportError::Io { location, source }),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_yaml::from_str(&content).map_err(|e| TransportError::Parse {
            location,
            reason: e.to_string(),
        })
    }
}

impl DocumentTransport for FileTransport {
    fn read(&self, root: &str, file: &str) -> Result<Document, TransportError> {
        let path = self.resolve(root, file)?;
        let location = path.display().to_string();
        debug!("Reading config document {}", location);

        let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => TransportError::NotFound {
                location: location.clone(),
            },
            _ => TransportError::Io {
                location: location.clone(),
                source,
            },
        })?;

        Document::from_yaml_str(&content).map_err(|reason| TransportError::Parse { location, reason })
    }

    fn write(&self, path: &Path, tasks: &[TaskEntry], mode: WriteMode) -> Result<(), TransportError> {
        let location = path.display().to_string();
        let io_err = |source| TransportError::Io {
            location: location.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        // An empty sequence would serialize as `[]`, which cannot be
        // followed by a later append. Write nothing instead.
        let body = if tasks.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(tasks)?
        };

        let mut file = match mode {
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
            WriteMode::Overwrite => OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path),
        }
        .map_err(io_err)?;

        file.write_all(body.as_bytes()).map_err(io_err)?;
        debug!("Wrote {} task(s) to {} ({})", tasks.len(), location, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn entry(name: &str) -> TaskEntry {
        TaskEntry::new(vec![], name, Value::Sequence(vec![Value::from("x")]))
    }

    #[test]
    fn test_join_root() {
        assert_eq!(join_root("config", "drivers/"), "config/drivers");
        assert_eq!(join_root("config/", "/drivers"), "config/drivers");
        assert_eq!(join_root("", "drivers"), "drivers");
        assert_eq!(join_root("config", ""), "config");
        assert_eq!(join_root("config", "/"), "config");
        assert_eq!(join_root("https://srv", "cfg"), "https://srv/cfg");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let transport = FileTransport::new("/srv/images");
        assert_eq!(
            transport.resolve("config", "build.yaml").unwrap(),
            PathBuf::from("/srv/images/config/build.yaml")
        );
        assert_eq!(
            transport.resolve("/other", "build.yaml").unwrap(),
            PathBuf::from("/other/build.yaml")
        );
        assert_eq!(
            transport.resolve("", "build.yaml").unwrap(),
            PathBuf::from("/srv/images/build.yaml")
        );
    }

    #[test]
    fn test_remote_roots_are_unsupported() {
        let transport = FileTransport::new(".");
        let err = transport.read("https://new-server", "build.yaml").unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedRoot { .. }));
    }

    #[test]
    fn test_read_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileTransport::new(dir.path());

        let err = transport.read("", "build.yaml").unwrap_err();
        assert!(matches!(err, TransportError::NotFound { .. }));

        fs::write(dir.path().join("build.yaml"), "controls: 3\n").unwrap();
        let err = transport.read("", "build.yaml").unwrap_err();
        assert!(matches!(err, TransportError::Parse { .. }));
    }

    #[test]
    fn test_append_accumulates_entries() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cache").join("task_list.yaml");
        let transport = FileTransport::new(dir.path());

        transport.write(&out, &[entry("A"), entry("B")], WriteMode::Append).unwrap();
        transport.write(&out, &[], WriteMode::Append).unwrap();
        transport.write(&out, &[entry("C")], WriteMode::Append).unwrap();

        let names: Vec<String> = FileTransport::read_tasks(&out)
            .unwrap()
            .iter()
            .map(|t| t.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_overwrite_replaces_entries() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("task_list.yaml");
        let transport = FileTransport::new(dir.path());

        transport.write(&out, &[entry("A"), entry("B")], WriteMode::Append).unwrap();
        transport.write(&out, &[entry("C")], WriteMode::Overwrite).unwrap();

        let tasks = FileTransport::read_tasks(&out).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name(), Some("C"));
    }

    #[test]
    fn test_read_tasks_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = FileTransport::read_tasks(&dir.path().join("none.yaml")).unwrap();
        assert!(tasks.is_empty());
    }
}
