use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Compiled exclusion rules from the project's root `.gitignore`.
///
/// Absence of the ignore file is not an error; an unreadable or malformed one
/// degrades to the empty rule set with a warning. Reload by calling `load`
/// again — the set itself is immutable.
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    pub fn load(root: &Path) -> Self {
        let ignore_file = root.join(".gitignore");
        if !ignore_file.exists() {
            return Self::empty();
        }

        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(&ignore_file) {
            crate::warn_log!("could not load {}: {err}", ignore_file.display());
            return Self::empty();
        }
        match builder.build() {
            Ok(matcher) => Self { matcher },
            Err(err) => {
                crate::warn_log!("could not compile {}: {err}", ignore_file.display());
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    /// `rel_path` is relative to the project root. Directory rules apply to
    /// everything beneath the directory, so parents are consulted too.
    pub fn is_ignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }
}
