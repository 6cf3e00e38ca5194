//! Expansion of command line patterns into an ordered file list
//!
//! Each pattern is taken in the order given and may be:
//!
//! * an existing file, used as is
//! * a directory, walked recursively with entries sorted by name
//! * a path whose components contain `*` or `?` wildcards, matched
//!   against the file system and sorted
//!
//! File order decides which file counts as "previous" for the continuity
//! check, so every expansion is deterministic.

use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use regex::Regex;
use walkdir::WalkDir;

fn has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Translates one path component with wildcards into an anchored regex
fn component_regex(component: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    for c in component.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}

fn walk_directory(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Matches a wildcard pattern component by component
fn expand_wildcard(pattern: &str) -> Vec<PathBuf> {
    let path = Path::new(pattern);

    // 通配符之前的部分作为遍历起点
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy().into_owned();
        if rest.is_empty() && !has_wildcard(&text) {
            base.push(component.as_os_str());
        } else if let Component::Normal(_) = component {
            rest.push(text);
        }
    }
    let implicit_base = base.as_os_str().is_empty();
    if implicit_base {
        base.push(".");
    }

    let regexes: Option<Vec<Regex>> = rest.iter().map(|c| component_regex(c)).collect();
    let regexes = match regexes {
        Some(r) if !r.is_empty() => r,
        _ => return Vec::new(),
    };
    let depth = regexes.len();

    let mut matches: Vec<PathBuf> = WalkDir::new(&base)
        .follow_links(false)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(&base)
                .map(|relative| {
                    relative
                        .components()
                        .zip(regexes.iter())
                        .all(|(c, re)| re.is_match(&c.as_os_str().to_string_lossy()))
                })
                .unwrap_or(false)
        })
        .map(|e| {
            // 隐式起点"."不出现在结果路径中
            if implicit_base {
                e.path().strip_prefix(".").map(Path::to_path_buf).unwrap_or_else(|_| e.path().to_path_buf())
            } else {
                e.into_path()
            }
        })
        .collect();
    matches.sort();
    matches
}

/// Expands `patterns` into the ordered list of files to check
///
/// Patterns that match nothing are logged and skipped.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let path = Path::new(pattern);

        if path.is_dir() {
            let found = walk_directory(path);
            if found.is_empty() {
                warn!("{}: directory contains no files", pattern);
            }
            debug!("{}: {} files", pattern, found.len());
            files.extend(found);
        } else if path.exists() {
            files.push(path.to_path_buf());
        } else if !has_wildcard(pattern) {
            warn!("{}: no such file", pattern);
        } else {
            let found = expand_wildcard(pattern);
            if found.is_empty() {
                warn!("{}: no files match", pattern);
            }
            debug!("{}: {} files", pattern, found.len());
            files.extend(found);
        }
    }

    files
}
