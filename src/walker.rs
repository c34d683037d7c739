use crate::ignore_rules::IgnoreRules;
use crate::language::classify;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Defensive bound on tree depth. Symlinked directories are never followed,
/// so this only trips on genuinely pathological trees.
const MAX_WALK_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub abs_path: PathBuf,
    pub rel_path: PathBuf,
    pub extension: String,
    pub language: String,
    pub size_bytes: u64,
}

/// Enumerate every regular file under `root`, pruning ignored directories
/// before descent.
///
/// The walk is an explicit breadth-first work-list (no call-stack recursion)
/// with entries sorted per directory, so the output order is stable across
/// runs. Unreadable directories or entries are skipped with a warning and
/// never abort the walk.
pub fn walk_tree(root: &Path, rules: &IgnoreRules) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending: VecDeque<(PathBuf, usize)> = VecDeque::new();
    pending.push_back((root.to_path_buf(), 0));

    while let Some((dir, depth)) = pending.pop_front() {
        let reader = match std::fs::read_dir(&dir) {
            Ok(r) => r,
            Err(err) => {
                crate::warn_log!("skipping directory {}: {err}", dir.display());
                continue;
            }
        };

        let mut children = Vec::new();
        for item in reader {
            match item {
                Ok(entry) => children.push(entry),
                Err(err) => crate::warn_log!("skipping entry in {}: {err}", dir.display()),
            }
        }
        children.sort_by_key(|entry| entry.file_name());

        for child in children {
            let path = child.path();
            let Ok(rel) = path.strip_prefix(root) else { continue };
            let file_type = match child.file_type() {
                Ok(t) => t,
                Err(err) => {
                    crate::warn_log!("skipping {}: {err}", path.display());
                    continue;
                }
            };

            if file_type.is_dir() {
                if depth + 1 > MAX_WALK_DEPTH {
                    crate::warn_log!("depth bound reached, not descending into {}", path.display());
                    continue;
                }
                if rules.is_ignored(rel, true) {
                    continue;
                }
                pending.push_back((path, depth + 1));
            } else if file_type.is_file() {
                if rules.is_ignored(rel, false) {
                    continue;
                }
                files.push(path);
            }
            // Symlinks and special files are neither followed nor listed.
        }
    }

    files
}

/// Walk + derive: one `FileRecord` per discovered file. The relative path,
/// extension and language name are pure derivations of the absolute path.
pub fn discover_files(root: &Path, rules: &IgnoreRules) -> Vec<FileRecord> {
    walk_tree(root, rules)
        .into_iter()
        .filter_map(|abs_path| {
            let size_bytes = match std::fs::metadata(&abs_path) {
                Ok(m) => m.len(),
                Err(err) => {
                    crate::warn_log!("skipping {}: {err}", abs_path.display());
                    return None;
                }
            };
            let rel_path = abs_path.strip_prefix(root).ok()?.to_path_buf();
            let extension = abs_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            let language = classify(&extension);
            Some(FileRecord {
                abs_path,
                rel_path,
                extension,
                language,
                size_bytes,
            })
        })
        .collect()
}
