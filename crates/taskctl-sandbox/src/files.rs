//! File Manager — read/write/edit/multi_edit/metadata. Absolute paths only.

use std::path::Path;

use taskctl_core::{EditOp, ErrorKind, ExecutionResult};
use tracing::debug;

pub struct FileManager;

fn require_absolute(path: &str) -> Result<&Path, ExecutionResult> {
    let p = Path::new(path);
    if p.is_absolute() {
        Ok(p)
    } else {
        Err(ExecutionResult::error(ErrorKind::InvalidPath, format!("path must be absolute: {path}")))
    }
}

fn io_error_kind(e: &std::io::Error) -> ErrorKind {
    match e.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
        _ => ErrorKind::Internal,
    }
}

impl FileManager {
    pub async fn read(path: &str, offset: Option<usize>, limit: Option<usize>) -> ExecutionResult {
        let p = match require_absolute(path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let meta = match tokio::fs::metadata(p).await {
            Ok(m) => m,
            Err(e) => return ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
        };
        if !meta.is_file() {
            return ExecutionResult::error(ErrorKind::NotAFile, format!("{path} is not a regular file"));
        }

        let content = match tokio::fs::read_to_string(p).await {
            Ok(c) => c,
            Err(e) => return ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
        };

        let offset = offset.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(2000);
        let lines: Vec<&str> = content.lines().collect();
        let start = (offset - 1).min(lines.len());
        let end = (start + limit).min(lines.len());

        let rendered: Vec<String> = lines[start..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>6}\t{}", start + i + 1, line))
            .collect();

        debug!(path, lines = end - start, "file: read");
        ExecutionResult::success(rendered.join("\n"))
    }

    pub async fn write(path: &str, content: &str) -> ExecutionResult {
        let p = match require_absolute(path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        match p.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
                    return ExecutionResult::error(
                        ErrorKind::MissingParent,
                        format!("parent directory does not exist: {}", parent.display()),
                    );
                }
            }
            _ => {}
        }

        match tokio::fs::write(p, content).await {
            Ok(()) => {
                debug!(path, bytes = content.len(), "file: write");
                ExecutionResult::success(format!("wrote {} bytes to {path}", content.len()))
            }
            Err(e) => ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
        }
    }

    pub async fn edit(path: &str, old_string: &str, new_string: &str, replace_all: bool) -> ExecutionResult {
        let p = match require_absolute(path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let content = match tokio::fs::read_to_string(p).await {
            Ok(c) => c,
            Err(e) => return ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
        };

        match apply_edit(&content, old_string, new_string, replace_all) {
            Ok(updated) => match tokio::fs::write(p, &updated).await {
                Ok(()) => {
                    debug!(path, "file: edit");
                    ExecutionResult::success(format!("edited {path}"))
                }
                Err(e) => ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
            },
            Err(result) => result,
        }
    }

    pub async fn multi_edit(path: &str, edits: &[EditOp]) -> ExecutionResult {
        let p = match require_absolute(path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let mut content = match tokio::fs::read_to_string(p).await {
            Ok(c) => c,
            Err(e) => return ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
        };

        for (i, edit) in edits.iter().enumerate() {
            match apply_edit(&content, &edit.old_string, &edit.new_string, false) {
                Ok(updated) => content = updated,
                Err(mut result) => {
                    result.error_message = Some(format!("edit {} of {}: {}", i + 1, edits.len(), result.error_message.unwrap_or_default()));
                    return result;
                }
            }
        }

        match tokio::fs::write(p, &content).await {
            Ok(()) => {
                debug!(path, edits = edits.len(), "file: multi_edit");
                ExecutionResult::success(format!("applied {} edits to {path}", edits.len()))
            }
            Err(e) => ExecutionResult::error(io_error_kind(&e), format!("{path}: {e}")),
        }
    }

    pub async fn metadata(paths: &[String]) -> ExecutionResult {
        if paths.len() > 10 {
            return ExecutionResult::error(ErrorKind::Validation, "metadata accepts at most 10 paths per call");
        }

        let mut rows = Vec::with_capacity(paths.len());
        for path in paths {
            let p = match require_absolute(path) {
                Ok(p) => p,
                Err(e) => return e,
            };
            match tokio::fs::metadata(p).await {
                Ok(m) => {
                    let modified = m
                        .modified()
                        .ok()
                        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());
                    rows.push(serde_json::json!({
                        "path": path,
                        "size": m.len(),
                        "file_type": if m.is_dir() { "dir" } else if m.is_file() { "file" } else { "other" },
                        "mtime": modified,
                        "mode": unix_mode(&m),
                    }));
                }
                Err(e) => {
                    rows.push(serde_json::json!({ "path": path, "error": e.to_string() }));
                }
            }
        }

        debug!(count = paths.len(), "file: metadata");
        ExecutionResult::success(serde_json::to_string_pretty(&rows).unwrap_or_default())
    }
}

#[cfg(unix)]
fn unix_mode(m: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    m.permissions().mode()
}

#[cfg(not(unix))]
fn unix_mode(_m: &std::fs::Metadata) -> u32 {
    0
}

/// Literal (non-regex) string replacement with the `AmbiguousEdit`/`NotFound`
/// occurrence rules from the file manager contract.
fn apply_edit(content: &str, old: &str, new: &str, replace_all: bool) -> Result<String, ExecutionResult> {
    let count = content.matches(old).count();
    if count == 0 {
        return Err(ExecutionResult::error(ErrorKind::NotFound, "old_string not found in file"));
    }
    if !replace_all && count > 1 {
        return Err(ExecutionResult::error(
            ErrorKind::AmbiguousEdit,
            format!("old_string occurs {count} times; use replace_all or provide more context"),
        ));
    }
    if replace_all {
        Ok(content.replace(old, new))
    } else {
        Ok(content.replacen(old, new, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tmp_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn relative_path_is_invalid() {
        let r = FileManager::read("relative/path.txt", None, None).await;
        assert_eq!(r.error_kind, Some(ErrorKind::InvalidPath));
    }

    #[tokio::test]
    async fn read_numbers_lines() {
        let f = tmp_file("alpha\nbeta\n");
        let path = f.path().to_str().unwrap();
        let r = FileManager::read(path, None, None).await;
        assert!(r.ok);
        assert!(r.payload.contains("1\talpha"));
    }

    #[tokio::test]
    async fn write_without_parent_fails() {
        let r = FileManager::write("/no/such/parent/dir/file.txt", "x").await;
        assert_eq!(r.error_kind, Some(ErrorKind::MissingParent));
    }

    #[tokio::test]
    async fn edit_ambiguous_match_is_rejected() {
        let f = tmp_file("a\na\n");
        let path = f.path().to_str().unwrap();
        let r = FileManager::edit(path, "a", "b", false).await;
        assert_eq!(r.error_kind, Some(ErrorKind::AmbiguousEdit));
    }

    #[tokio::test]
    async fn edit_missing_old_string_is_not_found() {
        let f = tmp_file("hello\n");
        let path = f.path().to_str().unwrap();
        let r = FileManager::edit(path, "nope", "b", false).await;
        assert_eq!(r.error_kind, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn multi_edit_aborts_without_partial_write() {
        let f = tmp_file("one two three\n");
        let path = f.path().to_str().unwrap();
        let edits = vec![
            EditOp { old_string: "one".into(), new_string: "1".into() },
            EditOp { old_string: "missing".into(), new_string: "x".into() },
        ];
        let r = FileManager::multi_edit(path, &edits).await;
        assert!(!r.ok);
        let on_disk = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(on_disk, "one two three\n");
    }

    #[tokio::test]
    async fn metadata_rejects_over_ten_paths() {
        let paths: Vec<String> = (0..11).map(|i| format!("/tmp/x{i}")).collect();
        let r = FileManager::metadata(&paths).await;
        assert_eq!(r.error_kind, Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn metadata_reports_missing_paths_inline() {
        let r = FileManager::metadata(&["/definitely/not/here".to_string()]).await;
        assert!(r.ok);
        assert!(r.payload.contains("error"));
    }
}
