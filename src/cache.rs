use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use xxhash_rust::xxh3::xxh3_64;

use crate::ignore_rules::IgnoreRules;
use crate::language::classify;
use crate::render::render_block;
use crate::tokenizer::TokenCounter;
use crate::walker::discover_files;

// ---------------------------------------------------------------------------
// Token cost cache — path → cost of the file's rendered block.
//
// Built once per session with a parallel fan-out over the discovered tree,
// then kept fresh by the change watcher (refresh/invalidate). Each entry
// remembers the stat signature it was computed from, so readers can detect
// staleness without trusting event delivery, and an xxh3 content hash lets
// `refresh` skip the re-count when only the mtime moved.
//
// The cache is owned here; the batching engine only ever reads it. For watch
// mode it is shared as Arc<RwLock<_>>: entries are replaced wholesale under
// the write guard, so readers see the old or the new value, never a torn one.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Token cost of the file's rendered block.
    pub tokens: usize,
    pub size: u64,
    pub modified_ns: Option<u128>,
    pub content_hash: u64,
}

pub type SharedCache = Arc<RwLock<TokenCostCache>>;

pub fn modified_ns_of(meta: &std::fs::Metadata) -> Option<u128> {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
}

fn file_meta(abs_path: &Path) -> Result<(u64, Option<u128>)> {
    let m = std::fs::metadata(abs_path)
        .with_context(|| format!("Failed to stat {}", abs_path.display()))?;
    Ok((m.len(), modified_ns_of(&m)))
}

fn read_lossy(abs_path: &Path) -> Result<String> {
    let bytes = std::fs::read(abs_path)
        .with_context(|| format!("Failed to read {}", abs_path.display()))?;
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).to_string()))
}

#[derive(Debug)]
pub struct TokenCostCache {
    root: PathBuf,
    entries: HashMap<PathBuf, CacheEntry>,
}

impl TokenCostCache {
    /// One full discovery pass: filter ignored paths and extension-less files
    /// (those never enter the cache; they have no language grouping for the
    /// selection flows), then read, render and count everything else.
    /// Unreadable files are skipped with a warning and stay absent.
    pub fn build(root: &Path, rules: &IgnoreRules, counter: &dyn TokenCounter) -> Self {
        let records = discover_files(root, rules);

        let computed: Vec<(PathBuf, CacheEntry)> = records
            .par_iter()
            .filter(|r| !r.extension.is_empty())
            .filter_map(|r| match Self::compute_entry(&r.abs_path, &r.language, counter) {
                Ok(entry) => Some((r.abs_path.clone(), entry)),
                Err(err) => {
                    crate::warn_log!("skipping {}: {err:#}", r.abs_path.display());
                    None
                }
            })
            .collect();

        let mut entries = HashMap::with_capacity(computed.len());
        for (path, entry) in computed {
            entries.insert(path, entry);
        }

        Self {
            root: root.to_path_buf(),
            entries,
        }
    }

    fn compute_entry(abs_path: &Path, language: &str, counter: &dyn TokenCounter) -> Result<CacheEntry> {
        let (size, modified_ns) = file_meta(abs_path)?;
        let content = read_lossy(abs_path)?;
        let content_hash = xxh3_64(content.as_bytes());
        let block = render_block(&abs_path.display().to_string(), &content, language);
        Ok(CacheEntry {
            tokens: counter.count(&block),
            size,
            modified_ns,
            content_hash,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, abs_path: &Path) -> Option<&CacheEntry> {
        self.entries.get(abs_path)
    }

    /// Stat-compare an entry against the file on disk. Used by readers that
    /// want to revalidate instead of trusting event delivery.
    pub fn is_fresh(&self, abs_path: &Path) -> bool {
        match (self.entries.get(abs_path), file_meta(abs_path)) {
            (Some(e), Ok((size, modified_ns))) => e.size == size && e.modified_ns == modified_ns,
            _ => false,
        }
    }

    /// Re-read and re-store the cost for `abs_path` (create/modify path of
    /// the watcher state machine). When the content hash is unchanged only
    /// the stat signature is refreshed, since the count is already right.
    pub fn refresh(&mut self, abs_path: &Path, counter: &dyn TokenCounter) -> Result<()> {
        let (size, modified_ns) = file_meta(abs_path)?;
        let content = read_lossy(abs_path)?;
        let content_hash = xxh3_64(content.as_bytes());

        let hash_unchanged = self
            .entries
            .get(abs_path)
            .map(|e| e.content_hash == content_hash)
            .unwrap_or(false);
        if hash_unchanged {
            if let Some(entry) = self.entries.get_mut(abs_path) {
                entry.size = size;
                entry.modified_ns = modified_ns;
            }
            return Ok(());
        }

        let extension = abs_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let language = classify(extension);
        let block = render_block(&abs_path.display().to_string(), &content, &language);
        self.entries.insert(
            abs_path.to_path_buf(),
            CacheEntry {
                tokens: counter.count(&block),
                size,
                modified_ns,
                content_hash,
            },
        );
        Ok(())
    }

    /// Drop the entry for a deleted file.
    pub fn invalidate(&mut self, abs_path: &Path) {
        self.entries.remove(abs_path);
    }

    /// Deterministic (path-sorted) listing, e.g. for pickers and `--list`.
    pub fn files(&self) -> Vec<(&Path, &CacheEntry)> {
        let mut out: Vec<(&Path, &CacheEntry)> = self
            .entries
            .iter()
            .map(|(p, e)| (p.as_path(), e))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn into_shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }
}
