//! Search Manager — grep (regex + glob include filter) and glob, both capped
//! at a fixed row count with an explicit truncation marker.

use std::path::Path;

use globset::GlobBuilder;
use regex::Regex;
use taskctl_core::{ErrorKind, ExecutionResult};
use tracing::debug;
use walkdir::WalkDir;

pub struct SearchManager {
    result_limit: usize,
}

impl SearchManager {
    pub fn new(result_limit: usize) -> Self {
        Self { result_limit }
    }

    pub fn from_config(config: &taskctl_core::Config) -> Self {
        Self::new(config.search_result_limit)
    }

    pub fn grep(&self, pattern: &str, path: Option<&str>, include: Option<&str>) -> ExecutionResult {
        let regex = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => return ExecutionResult::error(ErrorKind::Validation, format!("invalid regex: {e}")),
        };

        let root = resolve_root(path);
        let include_glob = match include {
            Some(g) => match GlobBuilder::new(g).literal_separator(false).build() {
                Ok(g) => Some(g.compile_matcher()),
                Err(e) => return ExecutionResult::error(ErrorKind::Validation, format!("invalid include glob: {e}")),
            },
            None => None,
        };

        let mut rows = Vec::new();
        let mut truncated = false;

        'walk: for entry in walk(&root) {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ref glob) = include_glob {
                let name = entry.file_name().to_string_lossy();
                if !glob.is_match(name.as_ref()) {
                    continue;
                }
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else { continue };
            for (i, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    rows.push(format!("{}:{}:{}", entry.path().display(), i + 1, line));
                    if rows.len() >= self.result_limit {
                        truncated = true;
                        break 'walk;
                    }
                }
            }
        }

        debug!(pattern, rows = rows.len(), truncated, "search: grep");
        self.finish(rows, truncated, "No matches found")
    }

    pub fn glob(&self, pattern: &str, path: Option<&str>) -> ExecutionResult {
        let root = resolve_root(path);
        let glob = match GlobBuilder::new(pattern).literal_separator(false).build() {
            Ok(g) => g.compile_matcher(),
            Err(e) => return ExecutionResult::error(ErrorKind::Validation, format!("invalid glob pattern: {e}")),
        };

        let mut matches = Vec::new();
        let mut truncated = false;
        for entry in walk(&root) {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if glob.is_match(rel) {
                matches.push(entry.path().display().to_string());
                if matches.len() >= self.result_limit {
                    truncated = true;
                    break;
                }
            }
        }

        debug!(pattern, matches = matches.len(), truncated, "search: glob");
        self.finish(matches, truncated, "No files found")
    }

    fn finish(&self, rows: Vec<String>, truncated: bool, empty_message: &str) -> ExecutionResult {
        if rows.is_empty() && !truncated {
            return ExecutionResult::success(empty_message);
        }
        let payload = rows.join("\n");
        if truncated {
            ExecutionResult::error_with_payload(
                ErrorKind::Truncated,
                format!("results capped at {} rows", self.result_limit),
                payload,
            )
        } else {
            ExecutionResult::success(payload)
        }
    }
}

fn resolve_root(path: Option<&str>) -> std::path::PathBuf {
    match path {
        Some(p) => std::path::PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")),
    }
}

fn walk(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && name != "node_modules" && name != "target"
        })
        .filter_map(|e| e.ok())
}
